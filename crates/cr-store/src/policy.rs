//! Policy seam for blocks whose type the hierarchy does not know.

/// Decides what happens when the reader hands the store a block of an
/// unknown type.
///
/// The store passes the unknown `name` and the type-name chain of the
/// current context, nearest first. Returning the name of one of those
/// ancestors registers the unknown type as its child and keeps the block;
/// returning `None` drops the block.
pub trait TypePolicy {
    fn resolve_parent(&mut self, name: &str, ancestors: &[&str]) -> Option<String>;
}

/// Batch policy: unknown types are logged and dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct DropUnknown;

impl TypePolicy for DropUnknown {
    fn resolve_parent(&mut self, _name: &str, _ancestors: &[&str]) -> Option<String> {
        None
    }
}
