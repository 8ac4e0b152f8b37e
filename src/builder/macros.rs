//! Macros for ergonomic state declarations.

/// Declare a state enum and derive its [`State`](crate::core::State)
/// implementation. Each variant's name is its state label; unit, tuple
/// and struct variants are all accepted.
///
/// # Example
///
/// ```
/// use reactive_fsm::core::State;
/// use reactive_fsm::state_enum;
///
/// state_enum! {
///     pub enum Checkout {
///         Cart { items: u32 },
///         Payment(String),
///         Done,
///     }
/// }
///
/// assert_eq!(Checkout::Cart { items: 2 }.name(), "Cart");
/// assert_eq!(Checkout::Payment("card".into()).name(), "Payment");
/// assert_eq!(Checkout::STATE_NAMES, &["Cart", "Payment", "Done"]);
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
                $( ( $($tuple:ty),* $(,)? ) )?
                $( { $($field:ident : $field_ty:ty),* $(,)? } )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
                $( ( $($tuple),* ) )?
                $( { $($field : $field_ty),* } )?
            ),*
        }

        impl $name {
            /// Every declared state label, in declaration order.
            pub const STATE_NAMES: &'static [&'static str] = &[$(stringify!($variant)),*];
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant { .. } => stringify!($variant)),*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::State;

    state_enum! {
        enum TestState {
            Idle,
            Loading(u8),
            Ready { rows: Vec<u32>, cached: bool },
        }
    }

    #[test]
    fn state_enum_macro_generates_trait() {
        assert_eq!(TestState::Idle.name(), "Idle");
        assert_eq!(TestState::Loading(40).name(), "Loading");

        let ready = TestState::Ready {
            rows: vec![1, 2],
            cached: false,
        };
        assert_eq!(ready.name(), "Ready");
    }

    #[test]
    fn state_enum_payloads_take_part_in_equality() {
        let a = TestState::Loading(1);
        assert!(a.same_payload(&TestState::Loading(1)));
        assert!(!a.same_payload(&TestState::Loading(2)));
    }

    #[test]
    fn state_enum_lists_names_in_order() {
        assert_eq!(TestState::STATE_NAMES, &["Idle", "Loading", "Ready"]);
    }

    #[test]
    fn state_enum_supports_visibility() {
        state_enum! {
            pub enum PublicState {
                A,
                B,
            }
        }

        let _state = PublicState::A;
    }
}
