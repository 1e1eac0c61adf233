use std::fmt;

/// 128-bit opaque query identifier, represented as two 64-bit halves.
///
/// Equality and hashing are bitwise over `(high, low)`; the router never
/// interprets the bits beyond that.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId {
    /// High 64 bits.
    pub high_bits: u64,
    /// Low 64 bits.
    pub low_bits: u64,
}

impl QueryId {
    /// Builds a `QueryId` from its two halves.
    #[must_use]
    pub const fn new(high_bits: u64, low_bits: u64) -> Self {
        Self { high_bits, low_bits }
    }
}

impl fmt::Debug for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryId({self})")
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.high_bits, self.low_bits)
    }
}

/// Non-negative source identifier, unique only within a single [`QueryId`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub i64);

impl SourceId {
    /// Builds a `SourceId` from a raw, non-negative wire value.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// The raw wire value.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceId({})", self.0)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 128-bit opaque identifier for an originating worker (agent).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId {
    /// High 64 bits.
    pub high_bits: u64,
    /// Low 64 bits.
    pub low_bits: u64,
}

impl AgentId {
    /// Builds an `AgentId` from its two halves.
    #[must_use]
    pub const fn new(high_bits: u64, low_bits: u64) -> Self {
        Self { high_bits, low_bits }
    }
}

impl fmt::Debug for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentId({self})")
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.high_bits, self.low_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn query_id_equality_is_bitwise() {
        let a = QueryId::new(0xea8a_a095_697f_49f1, 0xb127_d50e_5b6e_2645);
        let b = QueryId::new(0xea8a_a095_697f_49f1, 0xb127_d50e_5b6e_2645);
        let c = QueryId::new(0xea8a_a095_697f_49f1, 0x0000_0000_0000_0001);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_formats_as_hex_halves() {
        let id = QueryId::new(0xea8a_a095_697f_49f1, 0xb127_d50e_5b6e_2645);
        assert_eq!(format!("{id}"), "ea8aa095697f49f1b127d50e5b6e2645");
    }

    proptest! {
        /// `QueryId`'s equality, hashing, and display are all pure functions
        /// of the two halves — two ids built from the same halves must agree
        /// on all three, for any halves.
        #[test]
        fn query_id_built_from_same_halves_is_always_equal_and_prints_identically(
            high in any::<u64>(),
            low in any::<u64>(),
        ) {
            let a = QueryId::new(high, low);
            let b = QueryId::new(high, low);
            prop_assert_eq!(a, b);
            prop_assert_eq!(format!("{a}"), format!("{b}"));
            prop_assert_eq!(format!("{a}").len(), 32);
        }

        /// `SourceId`'s wire value round-trips through `new`/`value` for any
        /// non-negative input.
        #[test]
        fn source_id_value_round_trips(raw in 0i64..i64::MAX) {
            prop_assert_eq!(SourceId::new(raw).value(), raw);
        }
    }
}
