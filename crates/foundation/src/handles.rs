/// Index handle into an [`Arena`](crate::arena::Arena).
///
/// Handles are only ever created by the arena that owns the slot, and slots
/// are never freed, so a handle stays valid for the arena's lifetime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

impl Handle {
    pub(crate) fn new(index: u32) -> Self {
        Handle(index)
    }

    pub fn index(&self) -> u32 {
        self.0
    }
}
