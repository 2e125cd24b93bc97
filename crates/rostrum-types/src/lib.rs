pub mod models;
pub mod summary;

pub use models::{Account, Invitation, Invitee, Rebuttal, Response, VoteTally};
pub use summary::InvitationSummary;
