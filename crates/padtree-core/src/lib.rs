mod tree;

pub use tree::buttons::{ButtonSet, InputSpace};
pub use tree::error::TreeError;
pub use tree::ids::NodeId;
pub use tree::savestate::Savestate;
pub use tree::search_tree::Tree;
pub use tree::uct::{SearchConfig, SearchConfigError};
