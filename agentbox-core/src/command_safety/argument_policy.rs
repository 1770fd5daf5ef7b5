//! Structural argument checks applied on top of allowlist membership.
//!
//! Allowlisting a program name is not enough for commands whose arguments
//! decide whether they are harmless: `chmod +x` versus `chmod -R 777`,
//! `find . -name` versus `find / -delete`.

use std::collections::BTreeSet;
use std::path::{Component, Path};

use once_cell::sync::Lazy;
use regex::Regex;

use super::validator::CommandInvocation;
use super::violation::PolicyViolation;

/// Interpreters that could be used to run `init.sh` indirectly.
pub const SHELL_INTERPRETERS: &[&str] = &["sh", "bash", "zsh", "dash", "ksh", "fish"];

const INIT_SCRIPT: &str = "init.sh";

const FIND_FORBIDDEN_ACTIONS: &[&str] = &["-exec", "-execdir", "-delete", "-ok", "-okdir"];

static CHMOD_EXECUTE_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ugoa]*\+x$").expect("chmod mode pattern is valid"));

/// Short options that consume a value.
const PKILL_VALUE_OPTIONS: &[char] = &['d', 'F', 'g', 'G', 'P', 's', 't', 'u', 'U'];
const KILLALL_VALUE_OPTIONS: &[char] = &['n', 'o', 's', 'u', 'y', 'Z'];

/// Long options of `pkill` and `killall` that consume a value unless given
/// as `--name=value`.
const KILL_LONG_VALUE_OPTIONS: &[&str] = &[
    "context", "delimiter", "euid", "group", "groups", "ns", "nslist", "older-than",
    "parent", "pgroup", "pidfile", "session", "signal", "terminal", "uid", "user",
    "younger-than",
];

/// Options that widen the match to everything except the target.
const KILL_INVERSE_OPTIONS: &[&str] = &["-v", "--inverse"];

/// Pattern characters that would let a name match more than itself.
const KILL_PATTERN_METACHARS: &[char] = &[
    '|', '*', '+', '?', '(', ')', '[', ']', '{', '}', '^', '$', '\\',
];

/// Apply the per-program checks for `invocation`.
pub fn check_arguments(
    invocation: &CommandInvocation,
    dev_process_names: &BTreeSet<String>,
) -> Result<(), PolicyViolation> {
    let program = invocation.policy_key();
    match program {
        "chmod" => check_chmod(&invocation.arguments),
        "find" => check_find(&invocation.arguments),
        INIT_SCRIPT => check_init_script(&invocation.program),
        "pkill" | "killall" => check_process_kill(program, &invocation.arguments, dev_process_names),
        "kill" => Err(PolicyViolation::KillByPid),
        interpreter if SHELL_INTERPRETERS.contains(&interpreter) => {
            check_interpreter(interpreter, &invocation.arguments)
        }
        _ => Ok(()),
    }
}

fn check_chmod(args: &[String]) -> Result<(), PolicyViolation> {
    let mut mode: Option<&str> = None;
    let mut has_file = false;

    for arg in args {
        if let Some(long) = arg.strip_prefix("--") {
            if long == "recursive" {
                return Err(PolicyViolation::ChmodRecursive);
            }
            if !long.is_empty() {
                return Err(PolicyViolation::ChmodOption {
                    option: arg.clone(),
                });
            }
            continue;
        }

        if arg.len() > 1 && arg.starts_with('-') {
            let cluster = &arg[1..];
            if cluster.chars().all(|c| "rwxXst".contains(c)) {
                // `-x` style symbolic removal, not an option.
                return Err(PolicyViolation::ChmodMode { mode: arg.clone() });
            }
            if cluster.contains('R') {
                return Err(PolicyViolation::ChmodRecursive);
            }
            return Err(PolicyViolation::ChmodOption {
                option: arg.clone(),
            });
        }

        match mode {
            None => mode = Some(arg),
            Some(_) => has_file = true,
        }
    }

    let mode = mode.ok_or(PolicyViolation::ChmodMissingMode)?;
    if mode.chars().all(|c| c.is_ascii_digit()) {
        return Err(PolicyViolation::ChmodNumericMode {
            mode: mode.to_string(),
        });
    }
    if !CHMOD_EXECUTE_ONLY.is_match(mode) {
        return Err(PolicyViolation::ChmodMode {
            mode: mode.to_string(),
        });
    }
    if !has_file {
        return Err(PolicyViolation::ChmodMissingFile);
    }
    Ok(())
}

fn check_find(args: &[String]) -> Result<(), PolicyViolation> {
    if let Some(action) = args
        .iter()
        .find(|arg| FIND_FORBIDDEN_ACTIONS.contains(&arg.as_str()))
    {
        return Err(PolicyViolation::FindAction {
            action: action.clone(),
        });
    }

    let mut index = 0;
    while let Some(arg) = args.get(index) {
        match arg.as_str() {
            "-H" | "-L" | "-P" => index += 1,
            "-D" => index += 2,
            level if level.starts_with("-O") && level[2..].chars().all(|c| c.is_ascii_digit()) => {
                index += 1;
            }
            _ => break,
        }
    }

    let paths: Vec<&String> = args
        .iter()
        .skip(index)
        .take_while(|arg| !arg.starts_with('-') && !matches!(arg.as_str(), "(" | "!" | ")"))
        .collect();
    if paths.is_empty() {
        return Err(PolicyViolation::FindMissingPath);
    }
    for path in paths {
        if !is_contained_find_path(path) {
            return Err(PolicyViolation::FindPath { path: path.clone() });
        }
    }
    Ok(())
}

fn is_contained_find_path(path: &str) -> bool {
    if path == "." || path == "./" {
        return true;
    }
    path.starts_with("./")
        && !Path::new(path)
            .components()
            .any(|component| matches!(component, Component::ParentDir))
}

fn check_init_script(program: &str) -> Result<(), PolicyViolation> {
    // The basename is already `init.sh`; a glob in the directory part could
    // still expand to some other script.
    if program.contains(['*', '?', '[', '{', '~']) {
        return Err(PolicyViolation::InitScriptPath {
            program: program.to_string(),
        });
    }
    Ok(())
}

fn check_interpreter(interpreter: &str, args: &[String]) -> Result<(), PolicyViolation> {
    let runs_init_script = args.iter().flat_map(|arg| arg.split_whitespace()).any(|word| {
        Path::new(word).file_name().and_then(|name| name.to_str()) == Some(INIT_SCRIPT)
    });
    if runs_init_script {
        return Err(PolicyViolation::InitScriptViaInterpreter {
            interpreter: interpreter.to_string(),
        });
    }
    Ok(())
}

/// Operands of a `pkill`/`killall` invocation, with option values skipped.
fn kill_operands<'a>(program: &str, args: &'a [String]) -> Result<Vec<&'a str>, PolicyViolation> {
    let value_options = if program == "killall" {
        KILLALL_VALUE_OPTIONS
    } else {
        PKILL_VALUE_OPTIONS
    };
    let mut operands = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            operands.extend(iter.by_ref().map(String::as_str));
            break;
        }
        if KILL_INVERSE_OPTIONS.contains(&arg.as_str()) {
            return Err(PolicyViolation::KillOption {
                program: program.to_string(),
                option: arg.clone(),
            });
        }
        if let Some(long) = arg.strip_prefix("--") {
            if !long.contains('=') && KILL_LONG_VALUE_OPTIONS.contains(&long) {
                iter.next();
            }
            continue;
        }
        let Some(cluster) = arg.strip_prefix('-').filter(|cluster| !cluster.is_empty()) else {
            operands.push(arg.as_str());
            continue;
        };
        // `-9`, `-KILL`, `-SIGTERM`: a signal, not an option cluster.
        let is_signal = cluster.chars().all(|c| c.is_ascii_digit())
            || (cluster.len() > 1
                && cluster
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        if is_signal {
            continue;
        }
        if cluster.contains('v') {
            return Err(PolicyViolation::KillOption {
                program: program.to_string(),
                option: arg.clone(),
            });
        }
        // The first value-taking flag consumes the rest of the cluster, or
        // the next argument when nothing follows it.
        if let Some(position) = cluster.find(value_options)
            && position + 1 == cluster.len()
        {
            iter.next();
        }
    }
    Ok(operands)
}

fn check_process_kill(
    program: &str,
    args: &[String],
    dev_process_names: &BTreeSet<String>,
) -> Result<(), PolicyViolation> {
    let operands = kill_operands(program, args)?;
    if operands.is_empty() {
        return Err(PolicyViolation::KillMissingTarget {
            program: program.to_string(),
        });
    }

    for target in operands {
        let rejected = || PolicyViolation::KillTarget {
            program: program.to_string(),
            target: target.to_string(),
        };
        if target.contains(KILL_PATTERN_METACHARS) || target.contains(".*") {
            return Err(rejected());
        }
        // `pkill -f 'node server.js'` targets by its first word.
        let first_word = target.split_whitespace().next().unwrap_or_default();
        let name = Path::new(first_word)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(first_word);
        if !dev_process_names.contains(name) {
            return Err(rejected());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    fn dev_names() -> BTreeSet<String> {
        ["node", "npm", "npx", "vite", "next"]
            .iter()
            .map(|name| (*name).to_string())
            .collect()
    }

    #[test]
    fn chmod_accepts_execute_only_modes() {
        for mode in ["+x", "u+x", "ug+x", "a+x"] {
            assert_eq!(check_chmod(&args(&[mode, "init.sh"])), Ok(()), "{mode}");
        }
    }

    #[test]
    fn chmod_rejects_everything_else() {
        assert_eq!(
            check_chmod(&args(&["755", "init.sh"])),
            Err(PolicyViolation::ChmodNumericMode {
                mode: "755".to_string()
            })
        );
        assert_eq!(
            check_chmod(&args(&["-R", "+x", "dir"])),
            Err(PolicyViolation::ChmodRecursive)
        );
        assert_eq!(
            check_chmod(&args(&["--recursive", "+x", "dir"])),
            Err(PolicyViolation::ChmodRecursive)
        );
        assert_eq!(
            check_chmod(&args(&["-vR", "+x", "dir"])),
            Err(PolicyViolation::ChmodRecursive)
        );
        assert_eq!(
            check_chmod(&args(&["+x", "-R", "dir"])),
            Err(PolicyViolation::ChmodRecursive)
        );
        assert!(matches!(
            check_chmod(&args(&["-x", "init.sh"])),
            Err(PolicyViolation::ChmodMode { .. })
        ));
        for mode in ["+w", "+r", "u+rwx", "+xw", "o=x"] {
            assert!(
                matches!(
                    check_chmod(&args(&[mode, "f"])),
                    Err(PolicyViolation::ChmodMode { .. })
                ),
                "{mode}"
            );
        }
        assert_eq!(
            check_chmod(&args(&["+x"])),
            Err(PolicyViolation::ChmodMissingFile)
        );
        assert_eq!(check_chmod(&[]), Err(PolicyViolation::ChmodMissingMode));
    }

    #[test]
    fn find_path_rules() {
        assert_eq!(check_find(&args(&[".", "-name", "*.js"])), Ok(()));
        assert_eq!(check_find(&args(&["./src", "-type", "f"])), Ok(()));
        assert_eq!(check_find(&args(&["-L", "./src", "./tests"])), Ok(()));
        assert_eq!(check_find(&args(&["-D", "tree", "."])), Ok(()));
        assert_eq!(check_find(&args(&["-O3", "."])), Ok(()));

        for path in ["/etc", "src", "..", "./..", "./src/../..", "~"] {
            assert_eq!(
                check_find(&args(&[path])),
                Err(PolicyViolation::FindPath {
                    path: path.to_string()
                }),
                "{path}"
            );
        }
        assert_eq!(
            check_find(&args(&["-name", "x"])),
            Err(PolicyViolation::FindMissingPath)
        );
    }

    #[test]
    fn find_rejects_actions_anywhere() {
        for action in FIND_FORBIDDEN_ACTIONS.iter().copied() {
            let result = check_find(&args(&[".", "-name", "x", action, "rm", "{}", "+"]));
            assert_eq!(
                result,
                Err(PolicyViolation::FindAction {
                    action: action.to_string()
                })
            );
        }
    }

    #[test]
    fn process_kill_targets() {
        let names = dev_names();
        assert_eq!(check_process_kill("pkill", &args(&["node"]), &names), Ok(()));
        assert_eq!(
            check_process_kill("pkill", &args(&["-f", "node server.js"]), &names),
            Ok(())
        );
        assert_eq!(
            check_process_kill("killall", &args(&["-9", "vite"]), &names),
            Ok(())
        );
        for target in ["bash", "sshd", "python", "nodejs"] {
            assert!(
                check_process_kill("pkill", &args(&[target]), &names).is_err(),
                "{target}"
            );
        }
        assert_eq!(
            check_process_kill("pkill", &args(&["-9"]), &names),
            Err(PolicyViolation::KillMissingTarget {
                program: "pkill".to_string()
            })
        );
    }

    #[test]
    fn process_kill_option_values_are_not_targets() {
        let names = dev_names();
        assert_eq!(
            check_process_kill("pkill", &args(&["bash", "-u", "node"]), &names),
            Err(PolicyViolation::KillTarget {
                program: "pkill".to_string(),
                target: "bash".to_string()
            })
        );
        assert!(check_process_kill("pkill", &args(&["-u", "root"]), &names).is_err());
        assert!(check_process_kill("pkill", &args(&["-unode", "sshd"]), &names).is_err());
        assert!(check_process_kill("pkill", &args(&["--signal", "node", "bash"]), &names).is_err());
        assert_eq!(
            check_process_kill("pkill", &args(&["-u", "dev", "-TERM", "vite"]), &names),
            Ok(())
        );
        assert_eq!(
            check_process_kill("pkill", &args(&["--signal=KILL", "node"]), &names),
            Ok(())
        );
    }

    #[test]
    fn process_kill_patterns_must_be_plain_names() {
        let names = dev_names();
        for pattern in ["node .*|bash", "node|bash", "^node", "nod[e]", "node.*"] {
            assert!(
                check_process_kill("pkill", &args(&["-f", pattern]), &names).is_err(),
                "{pattern}"
            );
        }
    }

    #[test]
    fn process_kill_checks_every_operand() {
        let names = dev_names();
        assert_eq!(
            check_process_kill("killall", &args(&["bash", "node"]), &names),
            Err(PolicyViolation::KillTarget {
                program: "killall".to_string(),
                target: "bash".to_string()
            })
        );
        assert_eq!(
            check_process_kill("killall", &args(&["node", "vite"]), &names),
            Ok(())
        );
        assert!(check_process_kill("pkill", &args(&["--", "node", "-bash"]), &names).is_err());
    }

    #[test]
    fn process_kill_rejects_inverse_match() {
        let names = dev_names();
        for option in ["-v", "--inverse", "-vf"] {
            assert_eq!(
                check_process_kill("pkill", &args(&[option, "node"]), &names),
                Err(PolicyViolation::KillOption {
                    program: "pkill".to_string(),
                    option: option.to_string()
                })
            );
        }
    }

    #[test]
    fn interpreter_cannot_run_init_script() {
        assert!(check_interpreter("bash", &args(&["init.sh"])).is_err());
        assert!(check_interpreter("sh", &args(&["./scripts/init.sh", "--fast"])).is_err());
        assert!(check_interpreter("bash", &args(&["-c", "./init.sh"])).is_err());
        assert_eq!(check_interpreter("bash", &args(&["build.sh"])), Ok(()));
    }

    #[test]
    fn init_script_path_must_be_literal() {
        assert_eq!(check_init_script("./init.sh"), Ok(()));
        assert_eq!(check_init_script("/opt/app/init.sh"), Ok(()));
        assert!(check_init_script("./*/init.sh").is_err());
    }
}
