use std::fmt::Debug;

/// A state whose fields may each be absent ("undefined").
///
/// Absent fields never overwrite defined ones: [`overlay`](Self::overlay)
/// is the only merge and it is field-by-field.
pub trait PartialState: Clone + Debug + Default + PartialEq + 'static {
    /// Layers `top` over `self`. Defined fields of `top` win; absent fields
    /// of `top` keep the value from `self`.
    fn overlay(&self, top: &Self) -> Self;

    /// Number of defined fields.
    fn defined_count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.defined_count() == 0
    }
}

impl PartialState for () {
    fn overlay(&self, _top: &Self) -> Self {}

    fn defined_count(&self) -> usize {
        0
    }
}

/// Declares a [`PartialState`] struct.
///
/// Every field is stored as `Option<T>`; the struct derives `Clone`,
/// `Debug`, `Default` and `PartialEq`, so do not derive those again.
///
/// ```rust
/// use trellis_state::{PartialState, partial_state};
///
/// partial_state! {
///     pub struct Counter {
///         pub count: u32,
///         pub label: String,
///     }
/// }
///
/// let base = Counter { count: Some(1), label: Some("a".into()) };
/// let top = Counter { count: None, label: Some("b".into()) };
/// let merged = base.overlay(&top);
/// assert_eq!(merged.count, Some(1));
/// assert_eq!(merged.label.as_deref(), Some("b"));
/// ```
#[macro_export]
macro_rules! partial_state {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq)]
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field: ::core::option::Option<$ty>, )*
        }

        impl $crate::PartialState for $name {
            fn overlay(&self, top: &Self) -> Self {
                Self {
                    $( $field: top.$field.clone().or_else(|| self.$field.clone()), )*
                }
            }

            fn defined_count(&self) -> usize {
                0 $( + usize::from(self.$field.is_some()) )*
            }
        }
    };
}
