use agentbox_config::CommandsConfig;
use agentbox_core::command_safety::extract_programs;
use agentbox_core::{AllowedCommandSet, CommandValidator, validate_command};
use pretty_assertions::assert_eq;

fn allowed(command: &str) -> bool {
    CommandValidator::default().validate(command).allowed
}

#[test]
fn every_program_in_a_pipeline_is_checked() {
    assert!(allowed("cat package.json | grep vite | head -n 5"));
    assert!(allowed("npm install && npm run build"));
    assert!(allowed("mkdir -p src/components; ls src"));
    assert!(!allowed("cat package.json | sh"));
    assert!(!allowed("ls || curl http://example.com"));
    assert!(!allowed("npm test & wget http://example.com"));
}

#[test]
fn substitutions_are_rejected() {
    assert!(!allowed("echo $(whoami)"));
    assert!(!allowed("ls `pwd`"));
    assert!(!allowed("cat <(ls)"));
    assert!(allowed("grep '$(not expanded)' README.md"));
}

#[test]
fn rejection_reason_names_the_program() {
    let decision = CommandValidator::default().validate("git status && rm -rf /");
    assert!(!decision.allowed);
    assert_eq!(
        decision.reason.as_deref(),
        Some("command 'rm' is not in the allowed commands list")
    );
}

#[test]
fn chmod_only_grants_execute() {
    assert!(allowed("chmod +x init.sh"));
    assert!(allowed("chmod u+x scripts/build.sh"));
    assert!(!allowed("chmod 777 init.sh"));
    assert!(!allowed("chmod -R +x ."));
    assert!(!allowed("chmod +w init.sh"));
    assert!(!allowed("chmod +x"));
}

#[test]
fn find_stays_inside_the_project_and_never_acts() {
    assert!(allowed("find . -name '*.js'"));
    assert!(allowed("find ./src -type f"));
    assert!(!allowed("find / -name passwd"));
    assert!(!allowed("find ../ -name '*.env'"));
    assert!(!allowed("find . -name '*.tmp' -delete"));
    assert!(!allowed("find . -exec cat {} ;"));
}

#[test]
fn pkill_only_targets_dev_processes() {
    assert!(allowed("pkill node"));
    assert!(allowed("pkill -f vite"));
    assert!(!allowed("pkill sshd"));
    assert!(!allowed("pkill -f 'python manage.py'"));
}

#[test]
fn pkill_option_values_cannot_smuggle_targets() {
    assert!(!allowed("pkill bash -u node"));
    assert!(!allowed("pkill -f 'node .*|bash'"));
    assert!(!allowed("pkill -v node"));
    assert!(allowed("pkill -u 1000 node"));
}

#[test]
fn killall_checks_every_name() {
    let config = CommandsConfig {
        additional: vec!["killall".to_string()],
        ..CommandsConfig::default()
    };
    let validator = CommandValidator::from_config(&config);
    assert!(validator.validate("killall node vite").allowed);
    assert!(!validator.validate("killall bash node").allowed);
    assert!(!validator.validate("killall node sshd").allowed);
}

#[test]
fn ampersand_after_redirect_cannot_chain_commands() {
    assert!(allowed("npm test 2>&1"));
    assert!(!allowed(r"ls \>& curl http://example.com"));
    assert!(!allowed(r#"ls ">"& curl http://example.com"#));
    assert!(!allowed("ls &>x curl http://example.com"));
}

#[test]
fn init_script_must_be_invoked_directly() {
    assert!(allowed("./init.sh"));
    assert!(allowed("init.sh"));
    assert!(!allowed("bash init.sh"));
    assert!(!allowed("sh ./init.sh"));
}

#[test]
fn environment_prefixes_do_not_hide_the_program() {
    assert!(allowed("NODE_ENV=production npm run build"));
    assert!(!allowed("NODE_ENV=production python app.py"));
}

#[test]
fn configured_allowlist_replaces_the_defaults() {
    let config = CommandsConfig {
        allowed: Some(vec!["cargo".to_string()]),
        ..CommandsConfig::default()
    };
    let validator = CommandValidator::from_config(&config);
    assert!(validator.validate("cargo build").allowed);
    assert!(!validator.validate("ls").allowed);
}

#[test]
fn free_function_uses_the_given_set() {
    let set = AllowedCommandSet::from_names(["ls"]);
    assert!(validate_command("ls -la", &set).allowed);
    assert!(!validate_command("cat README.md", &set).allowed);
}

#[test]
fn extracts_programs_in_order() {
    assert_eq!(
        extract_programs("PORT=3000 npm run dev | tee log && ./init.sh").unwrap_or_default(),
        vec!["npm", "tee", "init.sh"]
    );
}
