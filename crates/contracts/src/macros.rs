//! Field-group helpers
//!
//! Decoded sentences carry every attribute as an `Option`. The same structs
//! double as the aggregator's per-epoch groups, so they share one merge rule:
//! a present field overwrites, an absent field is skipped.

/// Implement `merge` / `is_empty` / `populated` for a struct whose listed fields are `Option`s.
macro_rules! field_group {
    ($ty:ident { $($field:ident),+ $(,)? }) => {
        impl $ty {
            /// Copy every field present on `other`, leaving the others untouched.
            pub fn merge(&mut self, other: &$ty) {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field.clone();
                    }
                )+
            }

            /// True when no field has been populated.
            pub fn is_empty(&self) -> bool {
                true $( && self.$field.is_none() )+
            }

            /// Number of populated fields.
            pub fn populated(&self) -> usize {
                0 $( + usize::from(self.$field.is_some()) )+
            }
        }
    };
}

pub(crate) use field_group;
