pub mod recognition;
pub mod roster;
pub mod ui;
pub mod users;

pub use recognition::{RecognitionPanel, RecognitionSettings, RecognitionView, ResultList};
pub use roster::{Roster, RosterView, SortKey, UserCard};
pub use ui::Ui;
pub use users::{ClickTarget, DetailSession, FormField, Registration, UserForm, UserManagementPanel};
