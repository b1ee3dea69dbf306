mod guard;

pub use guard::{owner_guard, session_guard, staff_guard, CurrentUser};
