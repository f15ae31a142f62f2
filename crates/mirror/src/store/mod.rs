mod cell;
mod entity;
mod errors;
mod selection;

pub use cell::{ObservableCell, Subscription};
pub use entity::EntityModel;
pub use errors::ErrorChannel;
pub use selection::{SelectionSnapshot, SelectionState};

/// Every read-model group the presentation layer renders from.
///
/// Cloning shares the underlying cells; components receive a clone instead of
/// reaching for globals.
#[derive(Debug, Clone)]
pub struct MirrorState {
    pub entities: EntityModel,
    pub selection: SelectionState,
    pub errors: ErrorChannel,
    pub version: ObservableCell<Option<String>>,
    /// Loadouts per row last accepted by the authority.
    pub layout: ObservableCell<Option<usize>>,
}

impl Default for MirrorState {
    fn default() -> Self {
        Self {
            entities: EntityModel::default(),
            selection: SelectionState::default(),
            errors: ErrorChannel::default(),
            version: ObservableCell::new("version", None),
            layout: ObservableCell::new("layout", None),
        }
    }
}
