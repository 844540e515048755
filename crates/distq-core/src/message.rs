/// Tags which message variant a `Node` is embedded in. Carried as the
/// node's `userdata`; a receiver dispatches on this to decide how to
/// interpret the delivery (and, in the owning collaborator, how to walk
/// back from the node to the outer record and drop its refcount).
///
/// Three variants are system-originated (object destruction fans out into
/// one object-release plus one handle-destruction per outstanding handle,
/// and a lone handle can be released without destroying anything); the
/// fourth carries an arbitrary user payload. The payload's bytes are not
/// stored here — per §1 the payload-storage container is an external
/// collaborator's responsibility, so only the tag travels with the core
/// `Node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    ObjectRelease,
    HandleRelease,
    HandleDestruction,
    Payload,
}
