/// Creates a single [`Turn`](crate::Turn) from a role shorthand.
///
/// ```rust
/// use duochat::{Role, turn};
///
/// let turn = turn!(model => "Done.");
/// assert_eq!(turn.role, Role::Model);
/// assert_eq!(turn.text, "Done.");
/// ```
#[macro_export]
macro_rules! turn {
    (user => $text:expr $(,)?) => {
        $crate::Turn::user($text)
    };
    (model => $text:expr $(,)?) => {
        $crate::Turn::model($text)
    };
    ($role:ident => $text:expr $(,)?) => {
        compile_error!("unsupported role: use user or model");
    };
}

/// Creates a `Vec<Turn>` from role/text pairs, e.g. for
/// [`ChatOrchestrator::restore_history`](crate::ChatOrchestrator::restore_history).
///
/// ```rust
/// use duochat::{Role, turns};
///
/// let transcript = turns![
///     user => "What is a monad?",
///     model => "A monoid in the category of endofunctors.",
/// ];
///
/// assert_eq!(transcript.len(), 2);
/// assert_eq!(transcript[0].role, Role::User);
/// assert_eq!(transcript[1].role, Role::Model);
/// ```
#[macro_export]
macro_rules! turns {
    () => {
        Vec::<$crate::Turn>::new()
    };
    ($($role:ident => $text:expr),+ $(,)?) => {
        vec![$($crate::turn!($role => $text)),+]
    };
}
