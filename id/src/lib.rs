// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A "typed" [UUID] crate.
//!
//! [UUID]: https://en.wikipedia.org/wiki/Universally_unique_identifier

use core::fmt::{Debug, Formatter};
use std::borrow::Borrow;
use std::fmt::Display;
use std::marker::PhantomData;
use uuid::Uuid;

/// A typed [UUID].
///
/// The goal of this crate is to create compile-time associations between UUIDs and types.
///
/// This association helps prevent us from conflating id types while avoiding the need to write a
/// different `FooId` type for each type which needs an id.
///
/// # Example
///
/// ```
/// # use mefeline_id::Id;
///
/// pub struct Evc {
///     id: Id<Self>,
///     name: String,
/// }
///
/// pub struct Link {
///     id: Id<Self>,
///     s_vlan: Option<u16>,
/// }
/// ```
///
/// The [Id] type disambiguates the return types of functions and resists programming errors.
///
/// ```compile_fail
/// # use mefeline_id::Id;
/// # struct Evc; struct Link;
/// fn mix_up(mut evc_id: Id<Evc>, link_id: Id<Link>) {
///     evc_id = link_id; // <- this won't compile, and that's a good thing
/// }
/// ```
///
/// [UUID]: https://en.wikipedia.org/wiki/Universally_unique_identifier
pub type Id<T> = AbstractIdType<fn() -> T, Uuid>;

/// An abstract, typed ID.
///
/// <div class="warning">
///
/// Unless you need something besides UUID, use the [Id] type alias instead.
///
/// </div>
///
/// [UUID]: https://en.wikipedia.org/wiki/Universally_unique_identifier
#[cfg_attr(feature = "serde", allow(clippy::unsafe_derive_deserialize))] // not used in deserialize method
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AbstractIdType<T, U = Uuid>(U, PhantomData<T>);

impl<T> AsRef<Uuid> for Id<T> {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl<T> Display for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <_ as Display>::fmt(self.0.as_hyphenated(), f)
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <_ as Debug>::fmt(self.0.as_hyphenated(), f)
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Id<T> {
    /// Namespace UUID used for generating namespaced [UUIDv5] identifiers
    ///
    /// [UUIDv5]: https://datatracker.ietf.org/doc/html/rfc9562#section-5.5
    pub const NAMESPACE_UUID: Uuid = Uuid::from_u128(0x6d65_665f_656c_696e_655f_6e73_5f69_6400);

    /// Generate a new `Id<T>`.
    ///
    /// This method returns a transparently wrapped [Uuid] which is compile-time tagged with the
    /// type parameter `T`. The annotation consumes no space and has no runtime overhead.
    #[inline(always)]
    #[must_use]
    pub fn new() -> Id<T> {
        AbstractIdType(Uuid::new_v4(), PhantomData)
    }

    /// Strip type safety and return the wrapped (untyped) [Uuid]
    #[must_use]
    pub const fn into_raw(self) -> Uuid {
        self.0
    }

    /// Return a reference to the underlying (untyped) [Uuid].
    #[must_use]
    pub const fn as_raw(&self) -> &Uuid {
        &self.0
    }

    /// Create a typed version of `uuid`.
    ///
    /// # Note
    ///
    /// You should not attempt to convert `Id<U>` into `Id<T>` by removing and re-adding the
    /// types as doing so defeats the purpose of this type. Use this only when you received the
    /// raw [Uuid] in a context where you may conclusively infer the type it is associated with.
    #[must_use]
    pub const fn from_raw(uuid: Uuid) -> Self {
        Self(uuid, PhantomData)
    }

    /// Generate a [UUID version 5] based on the supplied namespace and byte string.
    ///
    /// [UUID version 5]: https://datatracker.ietf.org/doc/html/rfc9562#section-5.5
    #[must_use]
    pub fn new_v5<N: Borrow<[u8]>>(namespace: Uuid, name: N) -> Self {
        Self(Uuid::new_v5(&namespace, name.borrow()), PhantomData)
    }

    /// Generate a compile-time "typed" UUID version 5.
    ///
    /// This value will not change between runs if `tag` does not, which is useful for
    /// deterministic fixture ids in tests.
    pub fn new_static(tag: &str) -> Self {
        Self::new_v5(Self::NAMESPACE_UUID, tag.as_bytes())
    }
}

impl<T> From<Id<T>> for Uuid {
    fn from(value: Id<T>) -> Self {
        value.0
    }
}

impl<T> From<Uuid> for Id<T> {
    /// You generally should not use this method. See the docs for [`Id::<T>::from_raw`]
    fn from(value: Uuid) -> Self {
        Self::from_raw(value)
    }
}

#[cfg(test)]
mod test {
    use crate::Id;

    #[test]
    fn parse_back() {
        struct Marker;
        let id = Id::<Marker>::new();
        assert_eq!(id, Id::from_raw(id.into_raw()));
    }

    #[test]
    fn new_generates_unique() {
        struct Marker;
        let a = Id::<Marker>::new();
        let b = Id::<Marker>::new();
        assert_ne!(a, b);
    }

    #[test]
    fn static_ids_are_deterministic() {
        struct Marker;
        let a = Id::<Marker>::new_static("evc-1");
        let b = Id::<Marker>::new_static("evc-1");
        let c = Id::<Marker>::new_static("evc-2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
