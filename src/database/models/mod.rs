pub mod label;
pub mod note;
pub mod user;

pub use label::Label;
pub use note::Note;
pub use user::User;
