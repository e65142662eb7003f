//! Macros for ergonomic state type declaration.

/// Generate a `State` implementation for a simple enum.
///
/// The generated enum derives `Clone`, `PartialEq`, `Debug` and the serde
/// traits, and implements `Display` using the variant name.
///
/// # Example
///
/// ```
/// use durable_fsm::core::State;
/// use durable_fsm::state_enum;
///
/// state_enum! {
///     pub enum JobState {
///         Running,
///         Waiting,
///         Done,
///         Failed,
///     }
///     done: [Done, Failed]
///     failed: [Failed]
/// }
///
/// assert_eq!(JobState::Waiting.name(), "Waiting");
/// assert!(JobState::Failed.is_done());
/// assert!(JobState::Failed.is_failed());
/// assert_eq!(JobState::Done.to_string(), "Done");
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(done: [$($done:ident),* $(,)?])?
        $(failed: [$($failed:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn is_done(&self) -> bool {
                match self {
                    $($(Self::$done => true,)*)?
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }

            fn is_failed(&self) -> bool {
                match self {
                    $($(Self::$failed => true,)*)?
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::core::State::name(self))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::State;

    state_enum! {
        enum TestState {
            Running,
            Waiting,
            Done,
            Failed,
        }
        done: [Done, Failed]
        failed: [Failed]
    }

    #[test]
    fn state_enum_macro_generates_trait() {
        let state = TestState::Running;
        assert_eq!(state.name(), "Running");
        assert!(!state.is_done());
        assert!(!state.is_failed());

        assert!(TestState::Done.is_done());
        assert!(!TestState::Done.is_failed());

        assert!(TestState::Failed.is_done());
        assert!(TestState::Failed.is_failed());
    }

    #[test]
    fn state_enum_implements_display() {
        assert_eq!(TestState::Waiting.to_string(), "Waiting");
        assert_eq!(format!("{}", TestState::Failed), "Failed");
    }

    #[test]
    fn state_enum_works_without_terminal_lists() {
        state_enum! {
            enum MinimalState {
                One,
                Two,
            }
        }

        assert!(!MinimalState::One.is_done());
        assert!(!MinimalState::Two.is_failed());
    }
}
