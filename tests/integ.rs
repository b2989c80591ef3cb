use anyhow::Result;
use taskdecl::{
    diagnostic_action, explain_run, title_with_actions, Action, Callable, ConfigBuilder,
    Generator, GlobalConfig, GroupItem, NameKey, RunContext, Task, TaskDict, TaskGroup,
    TaskRecord, TaskRef, Value,
};

// Build the record the engine would hand back to callables at run time.
fn record_for(dict: &TaskDict, full_name: &str) -> TaskRecord {
    TaskRecord {
        name: full_name.to_owned(),
        targets: dict.targets.clone().unwrap_or_default(),
        task_dep: dict.task_dep.clone().unwrap_or_default(),
        actions: dict.actions.clone().unwrap_or_default(),
    }
}

fn declare_group_c() -> Result<TaskGroup> {
    TaskGroup::builder().attach(
        Generator::new("c", || {
            let mut items: Vec<GroupItem> = Vec::with_capacity(6);

            // shell command subtask:
            items.push(
                Task::builder()
                    .name("echo")
                    .actions([Value::from("echo hi")])
                    .doc("my echo doc")
                    .targets(["hoho.txt"])
                    .build()
                    .expect("echo subtask builds")
                    .into(),
            );

            // function subtask, creator style:
            let c_fn = Callable::new("c_", |_| Ok(())).with_doc("here is a doc");
            items.push(Task::from_fn(c_fn).expect("fn subtask builds").into());

            for i in 0..2 {
                // function subtask, decorator style:
                items.push(
                    Task::builder()
                        .name(format!("subtask {i}"))
                        .doc(format!("a subtask {i}"))
                        .title(format!("this is {i} running"))
                        .attach(Callable::new("c_", |_| Ok(())))
                        .expect("decorated subtask builds")
                        .into(),
                );
                items.push(
                    Task::builder()
                        .name(format!("subtask {i} variant"))
                        .doc(format!("a subtask {i} variant"))
                        .title(format!("this is {i} running variant"))
                        .attach(Callable::new("d_", |_| Ok(())))
                        .expect("variant subtask builds")
                        .into(),
                );
            }
            items.into_iter()
        })
        .with_doc("hey!!!"),
    )
}

#[test]
fn test_declared_tasks_lower_for_the_engine() -> Result<()> {
    simple_logging::log_to_stderr(log::LevelFilter::Debug);

    let a_fn = Callable::new("a", |_| {
        println!("hello !");
        Ok(())
    })
    .with_doc("hey");
    let a = Task::builder().title("custom title").attach(a_fn.clone())?;

    let b = Task::builder()
        .task_dep([TaskRef::from(&a)])
        .attach(Callable::new("b", |_| Ok(())).with_doc("hey!"))?;

    let c = declare_group_c()?;

    // task a borrows the function's name and doc:
    let dict_a = a.to_engine_dict(false)?;
    assert_eq!(dict_a.name, NameKey::Base("a".to_owned()));
    assert_eq!(dict_a.doc.as_deref(), Some("hey"));
    let actions = dict_a.actions.clone().unwrap();
    assert_eq!(actions[0], Action::Call(diagnostic_action()));
    assert_eq!(actions[1], Action::Call(a_fn));
    let record = record_for(&dict_a, "a");
    assert_eq!(
        dict_a.title.clone().unwrap().render(&record),
        "a => custom title"
    );

    // task b depends on a by its resolved name:
    let dict_b = b.to_engine_dict(false)?;
    assert_eq!(dict_b.task_dep.clone().unwrap(), ["a"]);

    // group c: head first, then subtasks in yield order:
    let dicts: Vec<TaskDict> = c.to_engine_seq()?.collect::<Result<_>>()?;
    assert_eq!(dicts.len(), 7);
    assert_eq!(dicts[0].name, NameKey::GroupHead("c".to_owned()));
    assert_eq!(dicts[0].doc.as_deref(), Some("hey!!!"));
    assert_eq!(dicts[0].actions, None);

    // the name/doc listing the engine would print for these declarations:
    let mut listing = Vec::with_capacity(9);
    for dict in [&dict_a, &dict_b].into_iter().chain(&dicts) {
        let name = match &dict.name {
            NameKey::Sub(name) => format!("c:{name}"),
            other => other.as_str().to_owned(),
        };
        listing.push(format!("{name}   {}", dict.doc.clone().unwrap_or_default()));
    }
    listing.sort();
    assert_eq!(
        listing,
        [
            "a   hey",
            "b   hey!",
            "c   hey!!!",
            "c:c_   here is a doc",
            "c:echo   my echo doc",
            "c:subtask 0   a subtask 0",
            "c:subtask 0 variant   a subtask 0 variant",
            "c:subtask 1   a subtask 1",
            "c:subtask 1 variant   a subtask 1 variant",
        ]
    );

    // titles, as the engine's run reporter would show them:
    let echo = &dicts[1];
    let echo_record = record_for(echo, "c:echo");
    assert_eq!(title_with_actions(&echo_record), "c:echo => Cmd: echo hi");
    let sub0 = &dicts[3];
    let sub0_record = record_for(sub0, "c:subtask 0");
    assert_eq!(
        sub0.title.clone().unwrap().render(&sub0_record),
        "c:subtask 0 => this is 0 running"
    );

    Ok(())
}

#[test]
fn test_lowered_actions_run_engine_style() -> Result<()> {
    let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = ran.clone();
    let task = Task::from_fn(Callable::new("mark", move |_| {
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }))?;

    let dict = task.to_engine_dict(false)?;
    let record = record_for(&dict, "mark");
    let ctx = RunContext {
        task: &record,
        changed: None,
    };
    for action in dict.actions.unwrap() {
        match action {
            Action::Call(f) => f.call(&ctx)?,
            other => panic!("unexpected action {other}"),
        }
    }
    assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
    Ok(())
}

#[test]
fn test_diagnostic_reports_against_real_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let target = dir.path().join("hoho.txt");

    let task = Task::builder()
        .name("echo")
        .actions([Value::from("echo hi")])
        .targets([target.clone()])
        .build()?;
    let dict = task.to_engine_dict(false)?;
    let record = record_for(&dict, "echo");

    // target does not exist yet; the changed set is ignored:
    let changed = vec!["whatever.txt".to_owned()];
    let mut out = Vec::new();
    explain_run(&record, Some(&changed), &mut out);
    let msg = String::from_utf8(out)?;
    assert!(msg.starts_with("Running echo because one of its targets no longer exists:"));
    assert!(msg.contains("hoho.txt"));

    // once the target exists, the changed set is the reason:
    std::fs::write(&target, "hi\n")?;
    let mut out = Vec::new();
    explain_run(&record, Some(&changed), &mut out);
    let msg = String::from_utf8(out)?;
    assert_eq!(
        msg,
        "Running echo because the following changed: [\"whatever.txt\"]\n"
    );

    dir.close()?;
    Ok(())
}

#[test]
fn test_config_lowers_only_what_was_set() -> Result<()> {
    let config = ConfigBuilder::new()
        .default_tasks(["a", "b"])
        .continue_(true)
        .single(true)
        .always(true)
        .db_file("tmp_db.json")
        .backend("json")
        .verbosity(2)
        .failure_verbosity(2)
        .outfile("tmp_out.txt")
        .reporter("console")
        .num_process(2)
        .parallel_type("thread")
        .build()?;

    let expected = GlobalConfig {
        default_tasks: Some(vec!["a".to_owned(), "b".to_owned()]),
        continue_: Some(true),
        single: Some(true),
        always: Some(true),
        dep_file: Some("tmp_db.json".into()),
        backend: Some("json".to_owned()),
        verbosity: Some(2),
        failure_verbosity: Some(2),
        outfile: Some("tmp_out.txt".into()),
        reporter: Some("console".to_owned()),
        num_process: Some(2),
        par_type: Some("thread".to_owned()),
        ..GlobalConfig::default()
    };
    assert_eq!(config, expected);
    Ok(())
}
