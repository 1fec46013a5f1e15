//! Data models for help desk entities.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `UserIdentity`, `Role`: The signed-in user and their access level
//! - `TicketListItem`, `TicketDetail`: Ticket rows and full ticket records
//! - `TicketStatus`, `TicketPriority`, `TicketTab`: Ticket classification

pub mod ticket;
pub mod user;

pub use ticket::{TicketDetail, TicketListItem, TicketPriority, TicketStatus, TicketTab};
pub use user::{Role, UserIdentity};
