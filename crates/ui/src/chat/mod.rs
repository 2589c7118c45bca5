pub mod events;
pub mod feedback;
pub mod message_input;
pub mod message_list;
pub mod nickname_form;
pub mod scroll_manager;
pub mod view;

pub use feedback::ValidationFeedback;
pub use message_input::MessageInput;
pub use message_list::MessageList;
pub use nickname_form::NicknameForm;
pub use view::{ChatView, ConnectionStatus};
