pub use task::TaskController;
pub use user::UserController;

mod task;
mod user;
