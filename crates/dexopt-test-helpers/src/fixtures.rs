//! Test fixtures - application images for testing

use crate::builder::{ProgramBuilder, OBJECT};
use dexopt_core::DexProgram;

/// `B`, `A extends B`, `C implements A`; `Main` calls through both interfaces.
/// Both interfaces are erased.
pub fn interface_chain() -> DexProgram {
    ProgramBuilder::new()
        .interface("Lcom/app/B;", &[])
        .abstract_method("Lcom/app/B;", "b", "()V")
        .interface("Lcom/app/A;", &["Lcom/app/B;"])
        .abstract_method("Lcom/app/A;", "a", "()I")
        .class("Lcom/app/C;", &["Lcom/app/A;"])
        .method("Lcom/app/C;", "a", "()I", &["const/4", "return"])
        .method("Lcom/app/C;", "b", "()V", &["return-void"])
        .class("Lcom/app/Main;", &[])
        .field("Lcom/app/Main;", "current", "Lcom/app/A;")
        .method(
            "Lcom/app/Main;",
            "main",
            "(Lcom/app/A;)V",
            &[
                "invoke-interface Lcom/app/A;.a:()I",
                "check-cast Lcom/app/B;",
                "invoke-interface Lcom/app/B;.b:()V",
                "return-void",
            ],
        )
        .local("Lcom/app/Main;", 1, "b", "Lcom/app/B;")
        .build()
}

/// `X` implemented by `C1` and `C2`; never a candidate
pub fn two_implementors() -> DexProgram {
    ProgramBuilder::new()
        .interface("Lcom/app/X;", &[])
        .abstract_method("Lcom/app/X;", "x", "()V")
        .class("Lcom/app/C1;", &["Lcom/app/X;"])
        .method("Lcom/app/C1;", "x", "()V", &["return-void"])
        .class("Lcom/app/C2;", &["Lcom/app/X;"])
        .method("Lcom/app/C2;", "x", "()V", &["return-void"])
        .class("Lcom/app/Main;", &[])
        .method(
            "Lcom/app/Main;",
            "run",
            "(Lcom/app/X;)V",
            &["invoke-interface Lcom/app/X;.x:()V", "return-void"],
        )
        .build()
}

/// Annotation interface `Y` with a single implementor; excluded
pub fn annotation_interface() -> DexProgram {
    ProgramBuilder::new()
        .interface("Lcom/app/Y;", &[])
        .access("Lcom/app/Y;", &["public", "interface", "abstract", "annotation"])
        .class("Lcom/app/D;", &["Lcom/app/Y;"])
        .build()
}

/// External interface `Z` implemented by internal `E`; never in the map
pub fn external_interface() -> DexProgram {
    ProgramBuilder::new()
        .library_interface("Landroid/view/Z;", &[])
        .class("Lcom/app/E;", &["Landroid/view/Z;"])
        .method("Lcom/app/E;", "onZ", "()V", &["return-void"])
        .build()
}

/// An interface with a default method next to one that is safe to erase
pub fn default_method_interface() -> DexProgram {
    ProgramBuilder::new()
        .interface("Lcom/app/Greeter;", &[])
        .method("Lcom/app/Greeter;", "greet", "()V", &["return-void"])
        .class("Lcom/app/English;", &["Lcom/app/Greeter;"])
        .interface("Lcom/app/Plain;", &[])
        .abstract_method("Lcom/app/Plain;", "go", "()V")
        .class("Lcom/app/Walker;", &["Lcom/app/Plain;"])
        .method("Lcom/app/Walker;", "go", "()V", &["return-void"])
        .build()
}

/// A library callback whose signature mentions an internal interface
pub fn externally_referenced() -> DexProgram {
    ProgramBuilder::new()
        .interface("Lcom/app/Listener;", &[])
        .abstract_method("Lcom/app/Listener;", "onEvent", "()V")
        .class("Lcom/app/Handler;", &["Lcom/app/Listener;"])
        .method("Lcom/app/Handler;", "onEvent", "()V", &["return-void"])
        .library_class("Landroid/os/Bus;", Some(OBJECT), &[])
        .abstract_method("Landroid/os/Bus;", "register", "(Lcom/app/Listener;)V")
        .build()
}

/// JSON text of a small image exercising every kind of use site, spread over
/// two containers
pub fn sample_app_json() -> &'static str {
    r#"{
  "library": [
    { "name": "Ljava/lang/Object;", "access": ["public"] },
    { "name": "Ljava/lang/Exception;", "superClass": "Ljava/lang/Object;", "access": ["public"] }
  ],
  "dexes": [
    [
      { "name": "Lcom/app/Repository;", "superClass": "Ljava/lang/Object;",
        "access": ["public", "interface", "abstract"],
        "methods": [
          { "name": "load", "proto": "(I)Lcom/app/Repository;", "access": ["public", "abstract"] }
        ] },
      { "name": "Lcom/app/Failure;", "superClass": "Ljava/lang/Object;",
        "access": ["public", "interface", "abstract"] },
      { "name": "Lcom/app/DiskRepository;", "superClass": "Ljava/lang/Object;",
        "interfaces": ["Lcom/app/Repository;", "Lcom/app/Failure;"], "access": ["public", "final"],
        "methods": [
          { "name": "load", "proto": "(I)Lcom/app/Repository;", "access": ["public"],
            "code": { "insns": [ { "op": "return-object" } ] } }
        ] }
    ],
    [
      { "name": "Lcom/app/Main;", "superClass": "Ljava/lang/Object;", "access": ["public"],
        "fields": [
          { "name": "repos", "type": "[Lcom/app/Repository;", "access": ["private"] }
        ],
        "methods": [
          { "name": "main", "proto": "(Lcom/app/Repository;)V", "access": ["public", "static"],
            "code": {
              "insns": [
                { "op": "invoke-interface", "method": "Lcom/app/Repository;.load:(I)Lcom/app/Repository;" },
                { "op": "check-cast", "type": "Lcom/app/Repository;" },
                { "op": "instance-of", "type": "Lcom/app/Failure;" },
                { "op": "new-array", "type": "[Lcom/app/Repository;" },
                { "op": "iput", "field": "Lcom/app/Main;.repos:[Lcom/app/Repository;" },
                { "op": "return-void" }
              ],
              "catches": ["Ljava/lang/Exception;"],
              "debug": { "lineStart": 3, "opcodes": [
                { "op": "start-local", "register": 0, "name": "repo", "type": "Lcom/app/Repository;" },
                { "op": "advance-pc", "addr": 4 },
                { "op": "end-local", "register": 0 }
              ] }
            } }
        ] }
    ]
  ]
}"#
}
