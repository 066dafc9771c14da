use proptest::prelude::*;

/// Strategy for module-like names (never the separator token)
pub fn module_name_strategy() -> impl Strategy<Value = String> {
    "[A-Z][a-zA-Z0-9]{0,15}"
}

/// Strategy for option values, which may contain dashes but never equal `--`
pub fn option_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9-]{1,8}".prop_filter("not the separator", |s| s != "--")
}

/// Strategy for a well-formed argument vector with between one and three
/// separators. Returns the vector and the expected stage name.
pub fn argument_vector_strategy() -> impl Strategy<Value = (Vec<String>, String)> {
    (
        module_name_strategy(),
        prop::collection::vec(option_strategy(), 0..4),
        prop::collection::vec(
            (module_name_strategy(), prop::collection::vec(option_strategy(), 0..3)),
            1..4,
        ),
    )
        .prop_map(|(stager, stager_options, segments)| {
            let mut args = vec![stager];
            args.extend(stager_options);
            let mut last_stage = String::new();
            for (stage, options) in segments {
                args.push("--".to_string());
                args.push(stage.clone());
                args.extend(options);
                last_stage = stage;
            }
            (args, last_stage)
        })
}

/// Strategy for argument vectors that contain no separator at all
pub fn separator_free_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(option_strategy(), 0..8)
}
