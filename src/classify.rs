use crate::error::TyperError;
use crate::python::{CommandArg, FunctionSite, ReturnShape};

/// Name prefixes that are never Redis command wrappers.
pub const DEFAULT_IGNORED: &[&str] = &[
    "__init__",
    "__new__",
    "__repr__",
    "__str__",
    "__eq__",
    "__call__",
    "get_encoder",
    "__contains__",
    "_tf",
    "tf",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Body raises before it could return; annotate as `None`.
    NoReturn,
    /// Returns something other than `execute_command(...)`; leave alone.
    NoExec,
    /// Issues exactly this Redis command.
    Command(String),
}

pub fn is_ignored(name: &str, ignore: &[String]) -> bool {
    ignore.iter().any(|prefix| name.starts_with(prefix.as_str()))
}

/// Decide what a function's return annotation should be derived from.
///
/// With `allow_branch_returns`, several returns are accepted as long as they
/// all issue the same command; otherwise more than one return is an error.
pub fn classify(
    site: &FunctionSite,
    allow_branch_returns: bool,
) -> Result<Classification, TyperError> {
    if site.returns.is_empty() {
        if site.leading_raise {
            return Ok(Classification::NoReturn);
        }
        return Err(TyperError::MissingReturn(site.name.clone()));
    }

    let args: Vec<&CommandArg> = site
        .returns
        .iter()
        .filter_map(|r| match r {
            ReturnShape::ExecuteCommand(arg) => Some(arg),
            ReturnShape::Other => None,
        })
        .collect();
    if args.len() != site.returns.len() {
        return Ok(Classification::NoExec);
    }

    if args.len() > 1 && !allow_branch_returns {
        return Err(TyperError::AmbiguousCommand(site.name.clone()));
    }

    let mut commands = args.into_iter().map(|arg| command_name(site, arg));
    let first = match commands.next() {
        Some(command) => command?,
        None => return Err(TyperError::MissingReturn(site.name.clone())),
    };
    for other in commands {
        if other? != first {
            return Err(TyperError::AmbiguousCommand(site.name.clone()));
        }
    }
    Ok(Classification::Command(first))
}

fn command_name(site: &FunctionSite, arg: &CommandArg) -> Result<String, TyperError> {
    match arg {
        CommandArg::Literal(command) => Ok(command.clone()),
        CommandArg::Args => Ok(site.name.clone()),
        CommandArg::Other(_) => Err(TyperError::NonLiteralCommand(site.name.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(name: &str, returns: Vec<ReturnShape>, leading_raise: bool) -> FunctionSite {
        FunctionSite {
            name: name.to_string(),
            is_async: false,
            annotation: None,
            insert_at: 0,
            returns,
            leading_raise,
        }
    }

    fn exec(command: &str) -> ReturnShape {
        ReturnShape::ExecuteCommand(CommandArg::Literal(command.to_string()))
    }

    #[test]
    fn single_literal_command() {
        let s = site("get", vec![exec("GET")], false);
        assert_eq!(classify(&s, false).unwrap(), Classification::Command("GET".into()));
    }

    #[test]
    fn args_identifier_uses_function_name() {
        let s = site("bitfield_ro", vec![ReturnShape::ExecuteCommand(CommandArg::Args)], false);
        assert_eq!(
            classify(&s, false).unwrap(),
            Classification::Command("bitfield_ro".into())
        );
    }

    #[test]
    fn raise_only_body_has_no_return() {
        let s = site("sync", vec![], true);
        assert_eq!(classify(&s, false).unwrap(), Classification::NoReturn);
    }

    #[test]
    fn missing_return_is_an_error() {
        let s = site("helper", vec![], false);
        assert!(matches!(classify(&s, false), Err(TyperError::MissingReturn(_))));
    }

    #[test]
    fn any_foreign_return_marks_no_exec() {
        let s = site("scan_iter", vec![exec("SCAN"), ReturnShape::Other], false);
        assert_eq!(classify(&s, false).unwrap(), Classification::NoExec);
    }

    #[test]
    fn multiple_returns() {
        let same = site("set", vec![exec("SET"), exec("SET")], false);
        assert!(matches!(classify(&same, false), Err(TyperError::AmbiguousCommand(_))));
        assert_eq!(classify(&same, true).unwrap(), Classification::Command("SET".into()));

        let differ = site("expire", vec![exec("EXPIRE"), exec("PEXPIRE")], false);
        assert!(matches!(classify(&differ, true), Err(TyperError::AmbiguousCommand(_))));
    }

    #[test]
    fn non_literal_first_argument() {
        let s = site(
            "command",
            vec![ReturnShape::ExecuteCommand(CommandArg::Other("cmd".into()))],
            false,
        );
        assert!(matches!(classify(&s, false), Err(TyperError::NonLiteralCommand(_))));
    }

    #[test]
    fn ignore_list_matches_prefixes() {
        let ignore: Vec<String> = DEFAULT_IGNORED.iter().map(|s| s.to_string()).collect();
        assert!(is_ignored("__init__", &ignore));
        assert!(is_ignored("tfcall", &ignore));
        assert!(!is_ignored("get", &ignore));
    }
}
