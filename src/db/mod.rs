pub mod attachments;
pub mod comments;
pub mod departments;
pub mod history;
pub mod projects;
pub mod refresh_tokens;
pub mod reports;
pub mod seed;
pub mod settings;
pub mod tickets;
pub mod users;
pub mod workflows;
