pub mod attachment;
pub mod comment;
pub mod department;
pub mod history;
pub mod project;
pub mod refresh_token;
pub mod ticket;
pub mod user;
pub mod workflow;

pub use attachment::Attachment;
pub use comment::Comment;
pub use department::Department;
pub use history::{HistoryEntry, TicketHistory};
pub use project::{Project, ProjectStatus};
pub use refresh_token::RefreshToken;
pub use ticket::{
    Assignee, Priority, Ticket, TicketDetail, TicketRow, TicketStatus, TicketType,
};
pub use user::{Role, User};
pub use workflow::{WorkflowRule, WorkflowTrigger};
