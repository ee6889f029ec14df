/// Which mutation produced a [`ChangeNotification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Edited,
    Toggled,
    Deleted,
    Reloaded,
}

/// Lightweight event emitted after a mutation has been persisted and committed.
///
/// Subscribers (typically a screen) re-read the store on receipt; the
/// notification does not carry the record itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotification {
    pub kind: ChangeKind,
    /// Id of the affected record. Empty for [`ChangeKind::Reloaded`].
    pub id: String,
}
