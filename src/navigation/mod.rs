pub mod dispatcher;
pub mod menu;
pub mod table;

pub use dispatcher::{
    LoadOptions, LoadTicket, LoadedView, MenuOutcome, Navigator, SwitchOutcome, ViewState, keep_edits, load_view,
};
pub use menu::{MenuNode, MenuState, build_menu_tree};
pub use table::TableSession;
