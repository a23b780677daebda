//! The table of operations one membrane half exposes to its counterpart.
//!
//! Every object argument is a pointer id into the callee's export registry, every other
//! value is a `CrossValue`, and every abrupt completion is a `CrossError`. Nothing that
//! crosses this trait is a reference into either realm's heap.

use crate::membrane::pointer::{
    CrossDescriptor, CrossError, CrossTargetMeta, CrossValue, LinkTarget, Pointer,
};
use crate::runner::ds::object_property::PropertyKey;

pub type CrossResult<T> = Result<T, CrossError>;

pub trait RealmCallables {
    /// Runs `source` as a script in the callee's realm.
    fn evaluate(&self, source: &str) -> CrossResult<CrossValue>;

    fn apply(&self, target: u64, this: CrossValue, args: Vec<CrossValue>) -> CrossResult<CrossValue>;

    /// `new_target` must be defined; an undefined one is an invalid invocation.
    fn construct(
        &self,
        target: u64,
        args: Vec<CrossValue>,
        new_target: CrossValue,
    ) -> CrossResult<CrossValue>;

    fn get(&self, target: u64, key: PropertyKey, receiver: CrossValue) -> CrossResult<CrossValue>;

    fn set(
        &self,
        target: u64,
        key: PropertyKey,
        value: CrossValue,
        receiver: CrossValue,
    ) -> CrossResult<bool>;

    fn has(&self, target: u64, key: PropertyKey) -> CrossResult<bool>;

    fn delete_property(&self, target: u64, key: PropertyKey) -> CrossResult<bool>;

    fn define_property(
        &self,
        target: u64,
        key: PropertyKey,
        desc: CrossDescriptor,
    ) -> CrossResult<bool>;

    fn get_own_property_descriptor(
        &self,
        target: u64,
        key: PropertyKey,
    ) -> CrossResult<Option<CrossDescriptor>>;

    fn get_prototype_of(&self, target: u64) -> CrossResult<CrossValue>;

    fn set_prototype_of(&self, target: u64, proto: CrossValue) -> CrossResult<bool>;

    fn is_extensible(&self, target: u64) -> CrossResult<bool>;

    fn prevent_extensions(&self, target: u64) -> CrossResult<bool>;

    fn own_keys(&self, target: u64) -> CrossResult<Vec<PropertyKey>>;

    /// Prototype, own descriptors and integrity of `target` in one call.
    fn get_target_meta(&self, target: u64) -> CrossResult<CrossTargetMeta>;

    /// Installs caller-side descriptors on a callee-side `target`, skipping index keys of
    /// non-arrays and keys the target already holds non-configurable.
    fn remap_descriptors(
        &self,
        target: CrossValue,
        descriptors: Vec<(PropertyKey, CrossDescriptor)>,
    ) -> CrossResult<()>;

    /// Installs placeholder accessors on `target` that fetch the descriptor of the same
    /// key from the caller-side `source` on first use.
    fn install_lazy_descriptors(
        &self,
        target: CrossValue,
        source: CrossValue,
        keys: Vec<PropertyKey>,
    ) -> CrossResult<()>;

    fn remap_proto(&self, target: CrossValue, proto: CrossValue) -> CrossResult<bool>;

    /// Resolves `target` locally and pins it; returns its pointer id.
    fn link_target(&self, target: &LinkTarget) -> CrossResult<u64>;

    /// Records that the caller's `foreign` object and the callee's `local` one are the
    /// same value.
    fn link_pointer(&self, foreign: Pointer, local: u64) -> CrossResult<()>;

    /// The caller no longer holds `count` references to `id`.
    fn release_pointer(&self, id: u64, count: usize);
}
