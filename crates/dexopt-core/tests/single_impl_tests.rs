use dexopt_core::config::SingleImplConfig;
use dexopt_core::ir::{Instruction, InvokeKind};
use dexopt_core::optimizer::single_impl::{collect_single_impl, InterfaceImplementors};
use dexopt_core::{
    load_image, ClassHierarchy, DexProgram, HasAccess, OptimizerError, PgoInput, Scope, SingleImplPass,
};
use dexopt_test_helpers::fixtures;
use dexopt_test_helpers::query::{
    all_instructions, class_names, has_class, instructions_of, interfaces_of, mentions,
    run_single_impl, run_single_impl_with,
};
use dexopt_test_helpers::ProgramBuilder;

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_interface_chain_is_fully_erased() {
    let mut program = fixtures::interface_chain();

    let stats = run_single_impl(&mut program);

    assert_eq!(stats.removed_interfaces, 2);
    assert_eq!(stats.invoke_interface_rewrites, 2);
    assert!(!has_class(&program, "Lcom/app/A;"));
    assert!(!has_class(&program, "Lcom/app/B;"));
    assert!(interfaces_of(&program, "Lcom/app/C;").is_empty());
    assert_eq!(
        instructions_of(&program, "Lcom/app/Main;"),
        vec![
            "invoke-virtual Lcom/app/C;.a:()I",
            "check-cast Lcom/app/C;",
            "invoke-virtual Lcom/app/C;.b:()V",
            "return-void",
        ]
    );
}

#[test]
fn test_signatures_fields_and_locals_are_retyped() {
    let mut program = fixtures::interface_chain();
    run_single_impl(&mut program);

    let c = program.types.get("Lcom/app/C;").unwrap();
    let main = program.find_class("Lcom/app/Main;").unwrap();
    assert_eq!(main.fields[0].ty, c);
    assert_eq!(main.methods[0].proto.args, vec![c]);
    assert!(!mentions(&program, "Lcom/app/A;"));
    assert!(!mentions(&program, "Lcom/app/B;"));
}

#[test]
fn test_two_implementors_are_left_alone() {
    let mut program = fixtures::two_implementors();
    let before = class_names(&program);

    let stats = run_single_impl(&mut program);

    assert_eq!(stats.removed_interfaces, 0);
    assert_eq!(stats.invoke_interface_rewrites, 0);
    assert_eq!(class_names(&program), before);
    assert_eq!(
        instructions_of(&program, "Lcom/app/Main;")[0],
        "invoke-interface Lcom/app/X;.x:()V"
    );
}

#[test]
fn test_annotation_interface_is_excluded() {
    let mut program = fixtures::annotation_interface();

    let stats = run_single_impl(&mut program);

    assert_eq!(stats.removed_interfaces, 0);
    assert!(has_class(&program, "Lcom/app/Y;"));
    assert_eq!(interfaces_of(&program, "Lcom/app/D;"), vec!["Lcom/app/Y;"]);
}

#[test]
fn test_external_interface_is_never_touched() {
    let mut program = fixtures::external_interface();
    let library_before = program.library.clone();

    let stats = run_single_impl(&mut program);

    assert_eq!(stats.removed_interfaces, 0);
    assert_eq!(program.library, library_before);
    assert_eq!(interfaces_of(&program, "Lcom/app/E;"), vec!["Landroid/view/Z;"]);
}

#[test]
fn test_library_signature_pins_interface() {
    let mut program = fixtures::externally_referenced();

    let stats = run_single_impl(&mut program);

    assert_eq!(stats.removed_interfaces, 0);
    assert!(has_class(&program, "Lcom/app/Listener;"));
}

#[test]
fn test_default_method_pins_only_its_interface() {
    let mut program = fixtures::default_method_interface();

    let stats = run_single_impl(&mut program);

    assert_eq!(stats.removed_interfaces, 1);
    assert!(has_class(&program, "Lcom/app/Greeter;"));
    assert!(!has_class(&program, "Lcom/app/Plain;"));
    assert!(interfaces_of(&program, "Lcom/app/Walker;").is_empty());
}

// =============================================================================
// Use sites
// =============================================================================

#[test]
fn test_every_use_site_kind_is_rewritten() {
    let mut program = load_image(fixtures::sample_app_json()).unwrap();

    let stats = run_single_impl(&mut program);

    assert_eq!(stats.removed_interfaces, 2);
    assert_eq!(stats.invoke_interface_rewrites, 1);
    assert_eq!(
        instructions_of(&program, "Lcom/app/Main;"),
        vec![
            "invoke-virtual Lcom/app/DiskRepository;.load:(I)Lcom/app/DiskRepository;",
            "check-cast Lcom/app/DiskRepository;",
            "instance-of Lcom/app/DiskRepository;",
            "new-array [Lcom/app/DiskRepository;",
            "iput Lcom/app/Main;.repos:[Lcom/app/DiskRepository;",
            "return-void",
        ]
    );
    let main = program.find_class("Lcom/app/Main;").unwrap();
    assert_eq!(
        program.types.resolve(main.fields[0].ty),
        "[Lcom/app/DiskRepository;"
    );
    assert!(!mentions(&program, "Lcom/app/Repository;"));
    assert!(!mentions(&program, "Lcom/app/Failure;"));
}

#[test]
fn test_containers_keep_their_shape() {
    let mut program = load_image(fixtures::sample_app_json()).unwrap();

    run_single_impl(&mut program);

    assert_eq!(program.dexen.len(), 2);
    assert_eq!(program.dexen[0].len(), 1);
    assert_eq!(program.dexen[1].len(), 1);
}

#[test]
fn test_interface_emptied_container_is_kept() {
    let mut program = ProgramBuilder::new()
        .interface("Lcom/app/Only;", &[])
        .new_dex()
        .class("Lcom/app/Impl;", &["Lcom/app/Only;"])
        .build();

    let stats = run_single_impl(&mut program);

    assert_eq!(stats.removed_interfaces, 1);
    assert_eq!(program.dexen.len(), 2);
    assert!(program.dexen[0].is_empty());
}

#[test]
fn test_surviving_super_interfaces_are_spliced_in() {
    let mut program = ProgramBuilder::new()
        .interface("Lcom/app/Shared;", &[])
        .interface("Lcom/app/Private;", &["Lcom/app/Shared;"])
        .class("Lcom/app/First;", &["Lcom/app/Private;"])
        .class("Lcom/app/Second;", &["Lcom/app/Shared;"])
        .build();

    let stats = run_single_impl(&mut program);

    assert_eq!(stats.removed_interfaces, 1);
    assert!(!has_class(&program, "Lcom/app/Private;"));
    assert_eq!(interfaces_of(&program, "Lcom/app/First;"), vec!["Lcom/app/Shared;"]);
}

// =============================================================================
// Rejections
// =============================================================================

#[test]
fn test_const_class_keeps_interface() {
    let mut program = ProgramBuilder::new()
        .interface("Lcom/app/Plugin;", &[])
        .class("Lcom/app/Impl;", &["Lcom/app/Plugin;"])
        .class("Lcom/app/Loader;", &[])
        .method("Lcom/app/Loader;", "load", "()V", &["const-class Lcom/app/Plugin;", "return-void"])
        .build();

    assert_eq!(run_single_impl(&mut program).removed_interfaces, 0);
    assert!(has_class(&program, "Lcom/app/Plugin;"));
}

#[test]
fn test_invoke_super_keeps_interface() {
    let mut program = ProgramBuilder::new()
        .interface("Lcom/app/Shape;", &[])
        .abstract_method("Lcom/app/Shape;", "area", "()I")
        .class("Lcom/app/Square;", &["Lcom/app/Shape;"])
        .method("Lcom/app/Square;", "area", "()I", &["invoke-super Lcom/app/Shape;.area:()I", "return"])
        .build();

    assert_eq!(run_single_impl(&mut program).removed_interfaces, 0);
}

#[test]
fn test_abstract_implementor_without_method_keeps_interface() {
    let mut program = ProgramBuilder::new()
        .interface("Lcom/app/Task;", &[])
        .abstract_method("Lcom/app/Task;", "run", "()V")
        .class("Lcom/app/BaseTask;", &["Lcom/app/Task;"])
        .access("Lcom/app/BaseTask;", &["public", "abstract"])
        .class("Lcom/app/Runner;", &[])
        .method("Lcom/app/Runner;", "go", "(Lcom/app/Task;)V", &["invoke-interface Lcom/app/Task;.run:()V"])
        .build();

    assert_eq!(run_single_impl(&mut program).removed_interfaces, 0);
    assert_eq!(
        instructions_of(&program, "Lcom/app/Runner;"),
        vec!["invoke-interface Lcom/app/Task;.run:()V"]
    );
}

#[test]
fn test_method_inherited_from_superclass_resolves() {
    let mut program = ProgramBuilder::new()
        .class("Lcom/app/Base;", &[])
        .method("Lcom/app/Base;", "run", "()V", &["return-void"])
        .interface("Lcom/app/Task;", &[])
        .abstract_method("Lcom/app/Task;", "run", "()V")
        .class("Lcom/app/Job;", &["Lcom/app/Task;"])
        .extends("Lcom/app/Job;", "Lcom/app/Base;")
        .class("Lcom/app/Runner;", &[])
        .method("Lcom/app/Runner;", "go", "(Lcom/app/Task;)V", &["invoke-interface Lcom/app/Task;.run:()V"])
        .build();

    let stats = run_single_impl(&mut program);

    assert_eq!(stats.removed_interfaces, 1);
    assert_eq!(
        instructions_of(&program, "Lcom/app/Runner;"),
        vec!["invoke-virtual Lcom/app/Job;.run:()V"]
    );
}

#[test]
fn test_overload_collision_keeps_interface() {
    let mut program = ProgramBuilder::new()
        .interface("Lcom/app/Node;", &[])
        .class("Lcom/app/Leaf;", &["Lcom/app/Node;"])
        .class("Lcom/app/Visitor;", &[])
        .method("Lcom/app/Visitor;", "visit", "(Lcom/app/Node;)V", &["return-void"])
        .method("Lcom/app/Visitor;", "visit", "(Lcom/app/Leaf;)V", &["return-void"])
        .build();

    assert_eq!(run_single_impl(&mut program).removed_interfaces, 0);
}

#[test]
fn test_override_collision_across_hierarchy_keeps_interface() {
    let mut program = ProgramBuilder::new()
        .interface("Lcom/app/Node;", &[])
        .class("Lcom/app/Leaf;", &["Lcom/app/Node;"])
        .class("Lcom/app/Base;", &[])
        .method("Lcom/app/Base;", "accept", "(Lcom/app/Leaf;)V", &["return-void"])
        .class("Lcom/app/Derived;", &[])
        .extends("Lcom/app/Derived;", "Lcom/app/Base;")
        .method("Lcom/app/Derived;", "accept", "(Lcom/app/Node;)V", &["return-void"])
        .build();

    assert_eq!(run_single_impl(&mut program).removed_interfaces, 0);
}

#[test]
fn test_blacklist_and_annotation_config() {
    let build = || {
        ProgramBuilder::new()
            .interface("Lcom/app/api/Callback;", &[])
            .annotate("Lcom/app/api/Callback;", "Lcom/app/Keep;")
            .class("Lcom/app/Impl;", &["Lcom/app/api/Callback;"])
            .build()
    };

    let mut program = build();
    let config = SingleImplConfig {
        package_black_list: vec!["Lcom/app/api/".to_string()],
        ..SingleImplConfig::default()
    };
    assert_eq!(run_single_impl_with(&mut program, config).removed_interfaces, 0);

    let mut program = build();
    let config = SingleImplConfig {
        anno_black_list: vec!["Lcom/app/Keep;".to_string()],
        ..SingleImplConfig::default()
    };
    assert_eq!(run_single_impl_with(&mut program, config).removed_interfaces, 0);

    let mut program = build();
    assert_eq!(run_single_impl(&mut program).removed_interfaces, 1);
}

#[test]
fn test_interface_with_surviving_sub_interface_is_kept() {
    let mut program = ProgramBuilder::new()
        .interface("Lcom/app/I;", &[])
        .abstract_method("Lcom/app/I;", "m", "()V")
        .interface("Lcom/app/J;", &["Lcom/app/I;"])
        .class("Lcom/app/C;", &["Lcom/app/I;"])
        .method("Lcom/app/C;", "m", "()V", &["return-void"])
        .class("Lcom/app/Main;", &[])
        .static_method(
            "Lcom/app/Main;",
            "take",
            "(Lcom/app/I;)V",
            &["invoke-interface Lcom/app/I;.m:()V", "return-void"],
        )
        .static_method(
            "Lcom/app/Main;",
            "pass",
            "(Lcom/app/J;)V",
            &["invoke-static Lcom/app/Main;.take:(Lcom/app/I;)V", "return-void"],
        )
        .build();
    let before = program.dexen.clone();

    let stats = run_single_impl(&mut program);

    assert_eq!(stats.removed_interfaces, 0);
    assert!(has_class(&program, "Lcom/app/I;"));
    assert_eq!(interfaces_of(&program, "Lcom/app/J;"), vec!["Lcom/app/I;"]);
    assert_eq!(program.dexen, before);
}

#[test]
fn test_kept_sub_interface_pins_the_whole_chain() {
    let mut program = ProgramBuilder::new()
        .interface("Lcom/app/Base;", &[])
        .interface("Lcom/app/Mid;", &["Lcom/app/Base;"])
        .interface("Lcom/app/Leaf;", &["Lcom/app/Mid;"])
        .annotate("Lcom/app/Leaf;", "Lcom/app/Keep;")
        .class("Lcom/app/Impl;", &["Lcom/app/Leaf;"])
        .build();
    let config = SingleImplConfig {
        anno_black_list: vec!["Lcom/app/Keep;".to_string()],
        ..SingleImplConfig::default()
    };

    let stats = run_single_impl_with(&mut program, config);

    assert_eq!(stats.removed_interfaces, 0);
    assert!(has_class(&program, "Lcom/app/Base;"));
    assert!(has_class(&program, "Lcom/app/Mid;"));
}

// =============================================================================
// Driver
// =============================================================================

#[test]
fn test_second_run_is_a_no_op() {
    let mut program = fixtures::interface_chain();
    run_single_impl(&mut program);
    let after_first = program.clone();

    let stats = run_single_impl(&mut program);

    assert_eq!(stats.removed_interfaces, 0);
    assert_eq!(stats.invoke_interface_rewrites, 0);
    assert_eq!(stats.cycles, 1);
    assert_eq!(program.dexen, after_first.dexen);
}

#[test]
fn test_cycle_cap_stops_early() {
    let mut program = fixtures::interface_chain();
    let config = SingleImplConfig {
        max_cycles: 1,
        ..SingleImplConfig::default()
    };

    let stats = run_single_impl_with(&mut program, config);

    assert_eq!(stats.cycles, 1);
    assert_eq!(stats.removed_interfaces, 2);

    let mut program = fixtures::interface_chain();
    assert_eq!(run_single_impl(&mut program).cycles, 2);
}

#[test]
fn test_external_class_in_scope_is_not_mutated() {
    let mut program = ProgramBuilder::new()
        .interface("Lcom/app/Service;", &[])
        .class("Lcom/app/Impl;", &["Lcom/app/Service;"])
        .class("Lcom/vendor/Prebuilt;", &[])
        .method("Lcom/vendor/Prebuilt;", "use", "(Lcom/app/Service;)V", &["return-void"])
        .external("Lcom/vendor/Prebuilt;")
        .build();
    let prebuilt_before = program.find_class("Lcom/vendor/Prebuilt;").unwrap().clone();

    let stats = run_single_impl(&mut program);

    assert_eq!(stats.removed_interfaces, 0);
    assert_eq!(program.find_class("Lcom/vendor/Prebuilt;").unwrap(), &prebuilt_before);
}

#[test]
fn test_converted_calls_resolve_on_the_implementor() {
    let mut program = load_image(fixtures::sample_app_json()).unwrap();
    run_single_impl(&mut program);

    for class in program.classes() {
        for insn in class.methods.iter().filter_map(|m| m.code.as_ref()).flat_map(|c| &c.insns) {
            let Instruction::Invoke { kind: InvokeKind::Virtual, method } = insn else {
                continue;
            };
            let owner = program.find_class_by_type(method.owner).unwrap();
            assert!(!owner.is_interface());
            assert!(owner.find_method(&method.name, &method.proto).is_some());
        }
    }
}

#[test]
fn test_unresolvable_interface_call_is_kept() {
    let mut program = ProgramBuilder::new()
        .interface("Lcom/app/Api;", &[])
        .class("Lcom/app/Impl;", &["Lcom/app/Api;"])
        .class("Lcom/app/Client;", &[])
        .method("Lcom/app/Client;", "call", "()V", &["invoke-interface Lcom/app/Api;.missing:()V"])
        .build();

    run_single_impl(&mut program);

    assert!(all_instructions(&program).contains(&"invoke-interface Lcom/app/Api;.missing:()V".to_string()));
}

#[test]
fn test_pgo_input_is_accepted() {
    let mut program = fixtures::interface_chain();
    let pgo = PgoInput(serde_json::json!({ "hot": ["Lcom/app/Main;"] }));

    let stats = SingleImplPass::new(SingleImplConfig::default())
        .run_pass(&mut program, &pgo)
        .unwrap();

    assert_eq!(stats.removed_interfaces, 2);
}

#[test]
fn test_unknown_interface_is_an_invariant_violation() {
    let mut program: DexProgram = ProgramBuilder::new()
        .class("Lcom/app/Impl;", &[])
        .build();
    let ghost = program.types.intern("Lcom/app/Ghost;");
    let implementor = program.types.intern("Lcom/app/Impl;");
    let mut implementors = InterfaceImplementors::default();
    implementors.insert(ghost, vec![implementor]);

    let scope = Scope::from_dexen(program.dexen.clone());
    let hierarchy = ClassHierarchy::build(&scope, &program.library, &program.types);
    let err = collect_single_impl(&implementors, &hierarchy).unwrap_err();

    assert!(matches!(err, OptimizerError::UnresolvedInterface { .. }));
    assert!(err.is_invariant_violation());
}
