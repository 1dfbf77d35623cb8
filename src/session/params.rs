//! Parameter entries and collections
//!
//! A session carries three collections (ranging, application, vendor), each a
//! bounded add-or-update map from a parameter id to a scalar or byte-array
//! value. Insertion order is kept because it is the order in which the
//! hardware receives the entries.
//!
//! Builders do not validate ids or values; the hardware layer is the
//! authority on legal ranges and reports `ParameterRejected`.

use crate::platform::error::{Result, UwbError};
use heapless::Vec;

/// Maximum byte-array parameter length (8 extended MAC addresses)
pub const MAX_PARAM_ARRAY_LEN: usize = 64;

/// Byte-array parameter storage
pub type ParamBytes = Vec<u8, MAX_PARAM_ARRAY_LEN>;

/// Parameter value type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamType {
    /// 32-bit scalar
    U32,
    /// Byte array
    ArrayU8,
}

/// Parameter value
///
/// Array values are copied into the entry so a session stored in the registry
/// never borrows from a transient command buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// 32-bit scalar
    U32(u32),
    /// Byte array
    ArrayU8(ParamBytes),
}

impl ParamValue {
    /// Get parameter type
    pub fn param_type(&self) -> ParamType {
        match self {
            ParamValue::U32(_) => ParamType::U32,
            ParamValue::ArrayU8(_) => ParamType::ArrayU8,
        }
    }

    /// Scalar value, if this is a scalar
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            ParamValue::U32(v) => Some(*v),
            ParamValue::ArrayU8(_) => None,
        }
    }

    /// Array bytes, if this is an array
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ParamValue::U32(_) => None,
            ParamValue::ArrayU8(bytes) => Some(bytes),
        }
    }
}

/// A parameter tagged with its identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamEntry<I> {
    pub id: I,
    pub value: ParamValue,
}

impl<I: Copy> ParamEntry<I> {
    /// Get parameter type
    pub fn param_type(&self) -> ParamType {
        self.value.param_type()
    }
}

/// Build a scalar entry
pub fn build_scalar<I>(id: I, value: u32) -> ParamEntry<I> {
    ParamEntry {
        id,
        value: ParamValue::U32(value),
    }
}

/// Build a byte-array entry
///
/// # Errors
///
/// Returns `UwbError::CapacityExceeded` if `value` is longer than
/// [`MAX_PARAM_ARRAY_LEN`].
pub fn build_array<I>(id: I, value: &[u8]) -> Result<ParamEntry<I>> {
    let bytes = ParamBytes::from_slice(value).map_err(|_| UwbError::CapacityExceeded)?;
    Ok(ParamEntry {
        id,
        value: ParamValue::ArrayU8(bytes),
    })
}

/// Bounded add-or-update parameter map
///
/// Keys are unique. Updating an existing id replaces its entry in place and
/// keeps its transmission position; a new id is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamCollection<I, const N: usize> {
    entries: Vec<ParamEntry<I>, N>,
}

impl<I: Copy + PartialEq, const N: usize> ParamCollection<I, N> {
    /// Create an empty collection
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert `entry`, replacing any entry with the same id
    ///
    /// # Errors
    ///
    /// Returns `UwbError::CapacityExceeded` if the id is new and the
    /// collection is full. The collection is unchanged.
    pub fn add_or_update(&mut self, entry: ParamEntry<I>) -> Result<()> {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry;
            return Ok(());
        }
        self.entries
            .push(entry)
            .map_err(|_| UwbError::CapacityExceeded)
    }

    /// Shorthand for `add_or_update(build_scalar(id, value))`
    pub fn set_scalar(&mut self, id: I, value: u32) -> Result<()> {
        self.add_or_update(build_scalar(id, value))
    }

    /// Shorthand for `add_or_update(build_array(id, value)?)`
    pub fn set_array(&mut self, id: I, value: &[u8]) -> Result<()> {
        self.add_or_update(build_array(id, value)?)
    }

    /// Look up an entry by id
    pub fn get(&self, id: I) -> Option<&ParamEntry<I>> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Remove an entry by id, preserving the order of the others
    pub fn remove(&mut self, id: I) -> Option<ParamEntry<I>> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Entries in transmission order
    pub fn iter(&self) -> impl Iterator<Item = &ParamEntry<I>> {
        self.entries.iter()
    }

    /// Entries as a slice, in transmission order
    pub fn as_slice(&self) -> &[ParamEntry<I>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<I: Copy + PartialEq, const N: usize> Default for ParamCollection<I, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestId {
        A,
        B,
        C,
    }

    #[test]
    fn test_build_scalar() {
        let entry = build_scalar(TestId::A, 25);
        assert_eq!(entry.id, TestId::A);
        assert_eq!(entry.param_type(), ParamType::U32);
        assert_eq!(entry.value.as_u32(), Some(25));
        assert_eq!(entry.value.as_bytes(), None);
    }

    #[test]
    fn test_build_array() {
        let entry = build_array(TestId::B, &[1, 2, 3]).unwrap();
        assert_eq!(entry.param_type(), ParamType::ArrayU8);
        assert_eq!(entry.value.as_bytes(), Some(&[1u8, 2, 3][..]));
        assert_eq!(entry.value.as_u32(), None);
    }

    #[test]
    fn test_build_array_too_long() {
        let long = [0u8; MAX_PARAM_ARRAY_LEN + 1];
        assert_eq!(
            build_array(TestId::A, &long).err(),
            Some(UwbError::CapacityExceeded)
        );
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut params: ParamCollection<TestId, 4> = ParamCollection::new();
        params.set_scalar(TestId::A, 1).unwrap();
        params.set_scalar(TestId::B, 2).unwrap();
        params.set_scalar(TestId::A, 10).unwrap();

        assert_eq!(params.len(), 2);
        let ids: std::vec::Vec<_> = params.iter().map(|e| e.id).collect();
        assert_eq!(ids, [TestId::A, TestId::B]);
        assert_eq!(params.get(TestId::A).unwrap().value.as_u32(), Some(10));
    }

    #[test]
    fn test_update_can_change_type() {
        let mut params: ParamCollection<TestId, 2> = ParamCollection::new();
        params.set_scalar(TestId::A, 1).unwrap();
        params.set_array(TestId::A, &[9, 9]).unwrap();

        assert_eq!(params.len(), 1);
        assert_eq!(params.get(TestId::A).unwrap().param_type(), ParamType::ArrayU8);
    }

    #[test]
    fn test_full_collection_rejects_new_id_but_accepts_update() {
        let mut params: ParamCollection<TestId, 2> = ParamCollection::new();
        params.set_scalar(TestId::A, 1).unwrap();
        params.set_scalar(TestId::B, 2).unwrap();
        assert!(params.is_full());

        assert_eq!(
            params.set_scalar(TestId::C, 3),
            Err(UwbError::CapacityExceeded)
        );
        assert!(params.get(TestId::C).is_none());

        params.set_scalar(TestId::B, 20).unwrap();
        assert_eq!(params.get(TestId::B).unwrap().value.as_u32(), Some(20));
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut params: ParamCollection<TestId, 4> = ParamCollection::new();
        params.set_scalar(TestId::A, 1).unwrap();
        params.set_scalar(TestId::B, 2).unwrap();
        params.set_scalar(TestId::C, 3).unwrap();

        let removed = params.remove(TestId::B).unwrap();
        assert_eq!(removed.value.as_u32(), Some(2));
        let ids: std::vec::Vec<_> = params.iter().map(|e| e.id).collect();
        assert_eq!(ids, [TestId::A, TestId::C]);
        assert!(params.remove(TestId::B).is_none());
    }

    #[test]
    fn test_clear() {
        let mut params: ParamCollection<TestId, 4> = ParamCollection::new();
        params.set_scalar(TestId::A, 1).unwrap();
        params.clear();
        assert!(params.is_empty());
        assert_eq!(params.capacity(), 4);
    }
}
