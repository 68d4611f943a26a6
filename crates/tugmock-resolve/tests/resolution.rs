//! End-to-end resolution behavior over whole projects.
//!
//! Each test builds parser-shaped input with the `test_helpers` builders and checks the
//! flattened graph, either through [`resolve_project`] or by driving the
//! [`FlatteningResolver`] against a shared [`ResolutionContext`].

use std::sync::Arc;

use rayon::prelude::*;
use tugmock_core::decl::AccessLevel;
use tugmock_core::diagnostics::DiagnosticCode;
use tugmock_resolve::test_helpers::{
    class, file, method, method_with, project, project_context, protocol, support_file,
    typealias, variable, DeclarationExt,
};
use tugmock_resolve::{
    resolve_project, FlatteningResolver, QualifyMode, QualifyOptions, QualifyScope,
    ResolutionContext, ResolveOptions, ResolvedType,
};

fn resolve(ctx: &ResolutionContext, module: &str, name: &str) -> Arc<ResolvedType> {
    let group = ctx.store.lookup(name, module).expect("declared type");
    FlatteningResolver::new(ctx)
        .resolve(group)
        .expect("resolution succeeds")
        .expect("mockable type")
}

fn method_names(resolved: &ResolvedType) -> Vec<&str> {
    resolved.methods.iter().map(|m| m.name.as_str()).collect()
}

mod end_to_end {
    use super::*;

    #[test]
    fn three_generation_chain_across_files() {
        let input = project(vec![
            file(
                "App",
                "Grandparent.swift",
                vec![class("Grandparent").with_methods(vec![method("a()")])],
            ),
            file(
                "App",
                "Parent.swift",
                vec![class("Parent")
                    .inheriting(&["Grandparent"])
                    .with_methods(vec![method("b()")])],
            ),
            file(
                "App",
                "Child.swift",
                vec![class("Child")
                    .inheriting(&["Parent"])
                    .with_methods(vec![method("c()")])],
            ),
        ]);
        let graph = resolve_project(&input, ResolveOptions::default(), Some(3)).unwrap();

        assert_eq!(graph.roots, vec!["App.Child", "App.Grandparent", "App.Parent"]);
        let child = graph.find("Child").unwrap();
        assert_eq!(method_names(child), vec!["a()", "b()", "c()"]);
        assert_eq!(child.all_inherited_type_names, vec!["App.Grandparent", "App.Parent"]);
        assert_eq!(child.location.file, "Child.swift");
        assert!(graph.diagnostics.is_empty());
        assert_eq!(graph.summary.warning_count, 0);
    }
}

mod diamond {
    use super::*;

    #[test]
    fn shared_member_appears_once() {
        let ctx = project_context(vec![file(
            "App",
            "A.swift",
            vec![
                protocol("Base").with_methods(vec![method_with("run(task:)", &[("task", "String")], None)]),
                protocol("Left").inheriting(&["Base"]).with_methods(vec![method("left()")]),
                protocol("Right").inheriting(&["Base"]).with_methods(vec![method("right()")]),
                protocol("Joined").inheriting(&["Left", "Right"]),
            ],
        )]);
        let joined = resolve(&ctx, "App", "Joined");
        assert_eq!(method_names(&joined), vec!["left()", "right()", "run(task:)"]);
        assert_eq!(joined.inherited_types, vec!["App.Left", "App.Right"]);
        assert_eq!(
            joined.all_inherited_type_names,
            vec!["App.Base", "App.Left", "App.Right"]
        );
    }

    #[test]
    fn shared_ancestor_is_resolved_once_per_graph() {
        let input = project(vec![file(
            "App",
            "A.swift",
            vec![
                protocol("Base").with_variables(vec![variable("id", "Int")]),
                protocol("Left").inheriting(&["Base"]),
                protocol("Right").inheriting(&["Base"]),
            ],
        )]);
        let graph = resolve_project(&input, ResolveOptions::default(), Some(4)).unwrap();
        assert_eq!(graph.types.len(), 3);
        for key in ["App.Left", "App.Right"] {
            let resolved = &graph.types[key];
            assert_eq!(resolved.variables.len(), 1);
            assert_eq!(resolved.variables[0].name, "id");
        }
    }
}

mod initializers {
    use super::*;

    #[test]
    fn designated_initializer_hides_superclass_initializers() {
        let mut convenience = method("init(name:)");
        convenience.attributes = vec!["convenience".to_string()];
        let ctx = project_context(vec![
            file(
                "App",
                "Base.swift",
                vec![class("Base").with_methods(vec![
                    method("init()"),
                    convenience,
                    method("refresh()"),
                ])],
            ),
            file(
                "App",
                "Derived.swift",
                vec![class("Derived")
                    .inheriting(&["Base"])
                    .with_methods(vec![method("init(id:)")])],
            ),
        ]);
        let derived = resolve(&ctx, "App", "Derived");
        assert_eq!(method_names(&derived), vec!["init(id:)", "refresh()"]);
        assert!(derived.declares_designated_initializer());
    }
}

mod aliases {
    use super::*;

    #[test]
    fn long_chain_resolves_to_concrete_name() {
        let ctx = project_context(vec![file(
            "App",
            "A.swift",
            vec![
                typealias("A", "B"),
                typealias("B", "C"),
                typealias("C", "D"),
                typealias("D", "Concrete"),
                protocol("Concrete").with_methods(vec![method("work()")]),
                protocol("Client").inheriting(&["A"]),
            ],
        )]);
        let client_group = ctx.store.lookup("Client", "App").unwrap();
        let scope = QualifyScope::inside(
            &client_group[0],
            Arc::new(ctx.visible_modules(client_group)),
        );
        let qualified = ctx.qualifier().qualify(
            "A",
            QualifyMode::AliasResolved,
            QualifyOptions::STANDARD,
            &scope,
        );
        assert_eq!(qualified, "App.Concrete");

        let client = resolve(&ctx, "App", "Client");
        assert_eq!(method_names(&client), vec!["work()"]);
        assert_eq!(client.inherited_types, vec!["App.Concrete"]);
    }

    #[test]
    fn alias_to_unknown_type_is_opaque() {
        let ctx = project_context(vec![file(
            "App",
            "A.swift",
            vec![
                typealias("Handle", "Missing"),
                protocol("Client").inheriting(&["Handle"]).with_methods(vec![method("go()")]),
            ],
        )]);
        let client = resolve(&ctx, "App", "Client");
        assert_eq!(method_names(&client), vec!["go()"]);
        assert!(client.has_opaque_inherited_type);
        assert!(ctx
            .diagnostics
            .snapshot()
            .iter()
            .any(|d| d.code == DiagnosticCode::UnresolvedAlias));
    }
}

mod specialization {
    use super::*;

    #[test]
    fn string_box_returns_string() {
        let ctx = project_context(vec![
            file(
                "App",
                "Box.swift",
                vec![class("Box")
                    .with_generics(&["T"])
                    .with_methods(vec![
                        method_with("get()", &[], Some("T")),
                        method_with("put(value:)", &[("value", "T?")], None),
                    ])],
            ),
            file(
                "App",
                "StringBox.swift",
                vec![class("StringBox").inheriting(&["Box<String>"])],
            ),
        ]);
        let string_box = resolve(&ctx, "App", "StringBox");
        assert_eq!(string_box.method("get()").unwrap().return_type_name, "String");
        let put = string_box.method("put(value:)").unwrap();
        assert_eq!(put.parameters[0].type_name, "String?");
        assert_eq!(put.return_type_name, "Void");

        let generic = resolve(&ctx, "App", "Box");
        assert_eq!(generic.method("get()").unwrap().return_type_name, "T");
    }

    #[test]
    fn arguments_naming_project_types_are_qualified() {
        let ctx = project_context(vec![file(
            "App",
            "A.swift",
            vec![
                class("User"),
                class("Box")
                    .with_generics(&["T"])
                    .with_methods(vec![method_with("get()", &[], Some("T"))]),
                class("UserBox").inheriting(&["Box<User>"]),
            ],
        )]);
        let user_box = resolve(&ctx, "App", "UserBox");
        assert_eq!(user_box.method("get()").unwrap().return_type_name, "App.User");
        assert_eq!(user_box.all_inherited_type_names, vec!["App.Box<App.User>"]);
    }

    #[test]
    fn alias_to_specialized_generic_keeps_arguments() {
        let ctx = project_context(vec![file(
            "App",
            "A.swift",
            vec![
                class("Box")
                    .with_generics(&["T"])
                    .with_methods(vec![method_with("get()", &[], Some("T"))]),
                typealias("StrBox", "Box<String>"),
                typealias("Storage", "StrBox"),
                class("Sub").inheriting(&["StrBox"]),
                class("DeepSub").inheriting(&["Storage"]),
            ],
        )]);
        for name in ["Sub", "DeepSub"] {
            let sub = resolve(&ctx, "App", name);
            assert_eq!(sub.method("get()").unwrap().return_type_name, "String");
            assert_eq!(sub.all_inherited_type_names, vec!["App.Box<String>"]);
        }
    }

    #[test]
    fn transitive_ancestor_names_are_specialized() {
        let ctx = project_context(vec![file(
            "App",
            "A.swift",
            vec![
                class("Box")
                    .with_generics(&["T"])
                    .with_methods(vec![method_with("get()", &[], Some("T"))]),
                class("Wrapper").with_generics(&["U"]).inheriting(&["Box<U>"]),
                class("IntWrapper").inheriting(&["Wrapper<Int>"]),
            ],
        )]);
        let wrapper = resolve(&ctx, "App", "Wrapper");
        assert_eq!(wrapper.all_inherited_type_names, vec!["App.Box<U>"]);

        let int_wrapper = resolve(&ctx, "App", "IntWrapper");
        assert_eq!(
            int_wrapper.all_inherited_type_names,
            vec!["App.Box<Int>", "App.Wrapper<Int>"]
        );
        assert_eq!(int_wrapper.method("get()").unwrap().return_type_name, "Int");
    }
}

mod opaque {
    use super::*;

    #[test]
    fn undeclared_ancestor_keeps_own_members() {
        let input = project(vec![file(
            "App",
            "A.swift",
            vec![class("Widget")
                .inheriting(&["UIView", "Missing<Int>"])
                .with_methods(vec![method("draw()")])
                .with_variables(vec![variable("title", "String")])],
        )]);
        let graph = resolve_project(&input, ResolveOptions::default(), Some(1)).unwrap();
        let widget = graph.find("Widget").unwrap();
        assert_eq!(method_names(widget), vec!["draw()"]);
        assert_eq!(widget.variables[0].name, "title");
        assert!(widget.opaque_inherited_type_names.contains("UIView"));
        assert!(widget.opaque_inherited_type_names.contains("Missing<Int>"));
        assert_eq!(graph.roots, vec!["App.Widget"]);
        assert_eq!(graph.summary.warning_count, 2);
    }
}

mod shadowing {
    use super::*;

    #[test]
    fn shadowed_module_prefix_is_omitted() {
        let mut app = file(
            "App",
            "App.swift",
            vec![class("Consumer").with_methods(vec![
                method_with("make()", &[], Some("Bar")),
                method_with("widget()", &[], Some("Widget")),
            ])],
        );
        app.imported_modules = vec!["Foo".to_string(), "Kit".to_string()];
        let input = project(vec![
            file("Foo", "Foo.swift", vec![class("Foo"), class("Bar")]),
            file("Kit", "Kit.swift", vec![class("Widget")]),
            app,
        ]);
        let graph = resolve_project(&input, ResolveOptions::default(), Some(2)).unwrap();

        let consumer = graph.find("Consumer").unwrap();
        assert_eq!(consumer.method("make()").unwrap().return_type_name, "Bar");
        assert_eq!(consumer.method("widget()").unwrap().return_type_name, "Kit.Widget");
        assert_eq!(graph.types["Foo.Bar"].fully_qualified_module_name, "Bar");
        assert!(graph
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::ModuleShadowing));
    }
}

mod linking {
    use super::*;

    fn dependent_project() -> tugmock_core::decl::ProjectInput {
        let mut input = project(vec![
            support_file(
                "Kit",
                "Kit.swift",
                vec![class("Base").with_access(AccessLevel::Open).with_methods(vec![{
                    let mut open = method("tick()");
                    open.access_level = AccessLevel::Open;
                    open
                }])],
            ),
            file("App", "App.swift", vec![class("Clock").inheriting(&["Base"])]),
        ]);
        input
            .module_dependencies
            .insert("App".to_string(), ["Kit".to_string()].into_iter().collect());
        input
    }

    #[test]
    fn relaxed_linking_reaches_undeclared_imports() {
        let graph =
            resolve_project(&dependent_project(), ResolveOptions::default(), Some(1)).unwrap();
        let clock = graph.find("Clock").unwrap();
        assert_eq!(method_names(clock), vec!["tick()"]);
        assert_eq!(clock.inherited_types, vec!["Kit.Base"]);
    }

    #[test]
    fn strict_linking_leaves_ancestor_opaque() {
        let options = ResolveOptions {
            relaxed_linking: false,
            ..ResolveOptions::default()
        };
        let graph = resolve_project(&dependent_project(), options, Some(1)).unwrap();
        let clock = graph.find("Clock").unwrap();
        assert!(clock.methods.is_empty());
        assert!(clock.opaque_inherited_type_names.contains("Base"));
    }

    #[test]
    fn well_known_protocol_ancestor_is_remapped() {
        let mut app = file(
            "App",
            "App.swift",
            vec![protocol("Delegate").inheriting(&["NSObjectProtocol"])],
        );
        app.imported_modules = vec!["Foundation".to_string()];
        let foundation = support_file(
            "Foundation",
            "Foundation.swift",
            vec![
                protocol("NSObjectProtocol").with_access(AccessLevel::Public),
                class("NSObject").with_access(AccessLevel::Open),
            ],
        );
        let ctx = project_context(vec![foundation, app]);
        let delegate = resolve(&ctx, "App", "Delegate");
        assert_eq!(delegate.inherited_types, vec!["Foundation.NSObject"]);
        assert_eq!(
            delegate.primary_self_conformance_type.as_deref(),
            Some("Foundation.NSObject")
        );
    }
}

mod determinism {
    use super::*;

    fn wide_project() -> tugmock_core::decl::ProjectInput {
        let mut files = vec![file(
            "Core",
            "Core.swift",
            vec![
                protocol("Identified")
                    .with_access(AccessLevel::Public)
                    .with_variables(vec![variable("id", "Identifier")]),
                class("Identifier"),
                class("Store")
                    .with_access(AccessLevel::Open)
                    .with_generics(&["Element"])
                    .with_methods(vec![{
                        let mut all = method_with("all()", &[], Some("[Element]"));
                        all.access_level = AccessLevel::Open;
                        all
                    }]),
            ],
        )];
        for index in 0..12 {
            let mut parsed = file(
                "App",
                &format!("Feature{index}.swift"),
                vec![
                    class(&format!("Model{index}")).inheriting(&["Identified"]),
                    class(&format!("Repo{index}"))
                        .inheriting(&[&format!("Store<Model{index}>")])
                        .with_methods(vec![method(&format!("load{index}()"))]),
                    protocol(&format!("Service{index}")).inheriting(&["Identified"]),
                ],
            );
            parsed.imported_modules = vec!["Core".to_string()];
            files.push(parsed);
        }
        project(files)
    }

    #[test]
    fn repeated_runs_produce_identical_graphs() {
        let input = wide_project();
        let serial = resolve_project(&input, ResolveOptions::default(), Some(1)).unwrap();
        let parallel = resolve_project(&input, ResolveOptions::default(), Some(8)).unwrap();
        let again = resolve_project(&input, ResolveOptions::default(), Some(8)).unwrap();

        assert_eq!(serial, parallel);
        assert_eq!(
            serde_json::to_string(&parallel).unwrap(),
            serde_json::to_string(&again).unwrap()
        );
        let repo = parallel.find("Repo3").unwrap();
        assert!(repo.method("all()").unwrap().return_type_name.ends_with("Model3]"));
        let service = parallel.find("Service7").unwrap();
        assert_eq!(service.variable("id").unwrap().type_name, "Core.Identifier");
    }

    #[test]
    fn concurrent_resolution_of_one_type_is_idempotent() {
        let ctx = project_context(vec![file(
            "App",
            "A.swift",
            vec![
                protocol("Base").with_methods(vec![method("a()")]),
                protocol("Left").inheriting(&["Base"]).with_methods(vec![method("b()")]),
                protocol("Right").inheriting(&["Base"]).with_methods(vec![method("c()")]),
                protocol("Leaf").inheriting(&["Left", "Right"]),
            ],
        )]);
        let group = ctx.store.lookup("Leaf", "App").unwrap();
        let resolver = FlatteningResolver::new(&ctx);
        let results: Vec<Arc<ResolvedType>> = (0..32)
            .into_par_iter()
            .map(|_| resolver.resolve(group).unwrap().unwrap())
            .collect();

        let first = &results[0];
        assert!(results.iter().all(|r| r.as_ref() == first.as_ref()));
        assert_eq!(method_names(first), vec!["a()", "b()", "c()"]);
    }
}
