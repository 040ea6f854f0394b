//! End-to-end pipeline tests over source programs.

use super::*;
use crate::ast::core::{ExprKind, Literal, Origin, Visibility};
use crate::ast::debruijn;
use crate::ast::Prog;
use crate::elaborate::TypeError;
use crate::normalise::NormError;
use crate::vnnlib::SmtLibError;

fn compile(source: &str) -> Result<Vec<PropertyQuery>, CompileError> {
    compile_source("test.vcl", source.to_string()).1
}

/// Run the front half of the pipeline (through normalisation) for tests
/// that inspect trees rather than queries.
fn normalise(source: &str) -> (Prog, crate::normalise::Normaliser) {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        tokens.push((result.expect("lexing failed"), lexer.span()));
    }
    let parsed = parse_prog(&tokens, 0).expect("parsing failed");
    let scoped = crate::scope::scope_prog(&parsed).expect("scoping failed");
    let elaborated = crate::elaborate::elab_prog(&scoped).expect("elaboration failed");
    crate::normalise::norm_prog(&elaborated).expect("normalisation failed")
}

fn decl_body<'a>(prog: &'a Prog, name: &str) -> &'a crate::ast::Expr {
    prog.iter()
        .find(|d| d.ident().as_str() == name)
        .and_then(|d| d.body())
        .unwrap_or_else(|| panic!("no body for '{}'", name))
}

const IDENTITY_NETWORK: &str = "network f : Tensor Real [1] -> Tensor Real [1] ;\n";

// --- Scenario S1: literal folding -------------------------------------

#[test]
fn literal_property_folds_to_true() {
    let (prog, _) = normalise("prop : Prop ;\nprop = 1 + 2 == 3 ;\n");
    assert!(matches!(
        decl_body(&prog, "prop").kind,
        ExprKind::Literal(Literal::Bool(true))
    ));
}

#[test]
fn literal_property_has_no_network() {
    let err = compile("prop : Prop ;\nprop = 1 + 2 == 3 ;\n").unwrap_err();
    assert!(matches!(
        err,
        CompileError::SmtLib(SmtLibError::NoNetworkUsedInProperty { .. })
    ));
}

// --- Scenario S2: identity network ------------------------------------

#[test]
fn identity_network_property_compiles() {
    let source = format!(
        "{}p : Prop ;\np = every (x : Tensor Real [1]) . let y = f x in y ! 0 >= 0.0 ;\n",
        IDENTITY_NETWORK
    );
    let queries = compile(&source).unwrap();
    assert_eq!(queries.len(), 1);
    let query = &queries[0];

    assert_eq!(query.property.as_str(), "p");
    assert_eq!(query.meta_network.len(), 1);
    assert_eq!(query.meta_network[0].as_str(), "f");

    // Magic variables quantified before the user variable, input equality
    // as the premise, output bound as the conclusion.
    assert!(query.smtlib.contains("(forall ((X0 Real))"));
    assert!(query.smtlib.contains("(forall ((Y0 Real))"));
    assert!(query.smtlib.contains("(forall ((x!0 Real))"));
    assert!(query.smtlib.contains("(=> (= X0 x!0) (>= Y0 0.0))"));
    assert!(query.smtlib.contains("(check-sat)"));
}

// --- Scenario S3: two networks over a shared input --------------------

#[test]
fn two_networks_share_the_magic_index_space() {
    let source = "\
network f : Tensor Real [2] -> Tensor Real [1] ;
network g : Tensor Real [2] -> Tensor Real [1] ;
p : Prop ;
p = every (x : Tensor Real [2]) . let y1 = f x in let y2 = g x in y1 ! 0 == y2 ! 0 ;
";
    let queries = compile(source).unwrap();
    let query = &queries[0];

    let names: Vec<&str> = query.meta_network.iter().map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["f", "g"]);

    // Four inputs and two outputs.
    for var in ["X0", "X1", "X2", "X3", "Y0", "Y1"] {
        assert!(
            query.smtlib.contains(&format!("(forall (({} Real))", var)),
            "missing quantifier for {}: {}",
            var,
            query.smtlib
        );
    }
    // Two input-equality premises over disjoint ranges.
    assert!(query.smtlib.contains("(and (= X0 x!0) (= X1 x!1))"));
    assert!(query.smtlib.contains("(and (= X2 x!0) (= X3 x!1))"));
    assert!(query.smtlib.contains("(= Y0 Y1)"));
}

// --- Scenario S4: unsolved constraints --------------------------------

#[test]
fn unannotated_quantifier_variable_is_unsolved() {
    let err = compile("p : Prop ;\np = every x . x == x ;\n").unwrap_err();
    assert!(matches!(
        err,
        CompileError::Type(TypeError::UnsolvedConstraints { .. })
    ));
}

// --- Scenario S5: empty quantifier domain -----------------------------

#[test]
fn empty_quantifier_domain_fails_in_the_normaliser() {
    let err = compile("p : Prop ;\np = every x inn [] . x > 0 ;\n").unwrap_err();
    assert!(matches!(
        err,
        CompileError::Norm(NormError::EmptyQuantifierDomain { .. })
    ));
}

#[test]
fn nonempty_quantifier_domain_expands() {
    let (prog, _) = normalise("p : Prop ;\np = every x inn [1, 2] . x >= 1 ;\n");
    assert!(matches!(
        decl_body(&prog, "p").kind,
        ExprKind::Literal(Literal::Bool(true))
    ));
}

// --- Scenario S6: implicit insertion ----------------------------------

#[test]
fn implicit_arguments_are_machine_inserted() {
    let source = "\
id : {t : Type 0} -> t -> t ;
id x = x ;
p : Prop ;
p = id True and id True ;
";
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        tokens.push((result.expect("lexing failed"), lexer.span()));
    }
    let parsed = parse_prog(&tokens, 0).unwrap();
    let scoped = crate::scope::scope_prog(&parsed).unwrap();
    let elaborated = crate::elaborate::elab_prog(&scoped).unwrap();

    // Each `id True` call carries a machine-inserted implicit argument.
    let body = decl_body(&elaborated, "p");
    let mut machine_implicits = 0;
    count_machine_implicit_args(body, &mut machine_implicits);
    assert!(
        machine_implicits >= 2,
        "expected machine-inserted implicits, found {}",
        machine_implicits
    );

    // And the whole thing still evaluates to True.
    let (normalised, _) = crate::normalise::norm_prog(&elaborated).unwrap();
    assert!(matches!(
        decl_body(&normalised, "p").kind,
        ExprKind::Literal(Literal::Bool(true))
    ));
}

fn count_machine_implicit_args(expr: &crate::ast::Expr, count: &mut usize) {
    if let ExprKind::App(head, args) = &expr.kind {
        // Only count insertions on user function applications, not on
        // literal overloading.
        if matches!(head.kind, ExprKind::Var(_)) {
            *count += args
                .iter()
                .filter(|a| a.origin == Origin::Machine && a.visibility == Visibility::Implicit)
                .count();
        }
        for arg in args {
            count_machine_implicit_args(&arg.expr, count);
        }
        count_machine_implicit_args(head, count);
    }
}

// --- Error taxonomy ---------------------------------------------------

#[test]
fn unbound_name_is_a_scope_error() {
    let err = compile("p : Prop ;\np = ghost ;\n").unwrap_err();
    assert!(matches!(err, CompileError::Scope(_)));
}

#[test]
fn unresolved_hole_is_reported_by_name() {
    let err = compile("p : Prop ;\np = ?goal ;\n").unwrap_err();
    match err {
        CompileError::Type(TypeError::UnresolvedHole { name, .. }) => assert_eq!(name, "goal"),
        other => panic!("expected UnresolvedHole, got {:?}", other),
    }
}

#[test]
fn program_without_properties_is_rejected() {
    let err = compile(&format!("{}", IDENTITY_NETWORK)).unwrap_err();
    assert!(matches!(
        err,
        CompileError::SmtLib(SmtLibError::NoPropertiesFound)
    ));
}

#[test]
fn bad_network_type_reports_the_defect() {
    let source =
        "network f : Real -> Real ;\np : Prop ;\np = every (x : Real) . let y = f x in y >= 0.0 ;\n";
    let err = compile(source).unwrap_err();
    assert!(matches!(
        err,
        CompileError::SmtLib(SmtLibError::UnsupportedNetworkType { .. })
    ));
}

#[test]
fn network_outside_let_binding_is_rejected() {
    let source = format!(
        "{}p : Prop ;\np = every (x : Tensor Real [1]) . (f x) ! 0 >= 0.0 ;\n",
        IDENTITY_NETWORK
    );
    let err = compile(&source).unwrap_err();
    assert!(matches!(
        err,
        CompileError::SmtLib(SmtLibError::NetworkNotLetBound { .. })
    ));
}

#[test]
fn type_mismatch_is_reported() {
    let err = compile("p : Prop ;\np = every (x : Tensor Real [1]) . x ;\n").unwrap_err();
    assert!(matches!(err, CompileError::Type(TypeError::Mismatch { .. })));
}

#[test]
fn invalid_token_is_reported_with_location() {
    let (sources, result) = compile_source("test.vcl", "p : Prop ;\np = @ ;\n".to_string());
    let err = result.unwrap_err();
    assert!(matches!(err, CompileError::InvalidToken { .. }));
    let formatted = format_error(&err, &sources);
    assert!(formatted.contains("test.vcl:2"));
}

// --- Quantified pipeline invariants -----------------------------------

#[test]
fn normalisation_is_idempotent_over_the_pipeline() {
    let source = format!(
        "{}p : Prop ;\np = every (x : Tensor Real [1]) . let y = f x in y ! 0 >= 0.0 and 1 + 1 == 2 ;\n",
        IDENTITY_NETWORK
    );
    let (prog, normaliser) = normalise(&source);
    for decl in &prog {
        if let Some(body) = decl.body() {
            let again = normaliser.norm(body).expect("renormalisation failed");
            assert!(
                debruijn::alpha_eq(&again, body),
                "normalisation not idempotent for '{}'",
                decl.ident()
            );
        }
    }
}

#[test]
fn elaborated_programs_recheck() {
    // Elaboration soundness: running the elaborator over its own output
    // (types already explicit, implicits already inserted) succeeds.
    let source = "\
id : {t : Type 0} -> t -> t ;
id x = x ;
p : Prop ;
p = id True and id True ;
";
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        tokens.push((result.expect("lexing failed"), lexer.span()));
    }
    let parsed = parse_prog(&tokens, 0).unwrap();
    let scoped = crate::scope::scope_prog(&parsed).unwrap();
    let elaborated = crate::elaborate::elab_prog(&scoped).unwrap();
    let reelaborated = crate::elaborate::elab_prog(&elaborated).unwrap();
    assert_eq!(elaborated.len(), reelaborated.len());
}

#[test]
fn vnnlib_output_has_no_free_identifiers() {
    // Free-variable purity: the rewritten body contains no reference to
    // the network (checked indirectly: emission succeeded, and the
    // meta-network is the only place the identifier appears).
    let source = format!(
        "{}p : Prop ;\np = every (x : Tensor Real [1]) . let y = f x in y ! 0 >= 0.0 ;\n",
        IDENTITY_NETWORK
    );
    let queries = compile(&source).unwrap();
    let query = &queries[0];
    for line in query.smtlib.lines() {
        if line.starts_with(';') {
            continue;
        }
        assert!(
            !line.contains(" f ") && !line.contains("(f "),
            "network identifier leaked into the query: {}",
            line
        );
    }
}

#[test]
fn definitions_are_inlined_before_the_backend() {
    // A non-property helper definition disappears into the property.
    let source = format!(
        "{}threshold : Real ;\nthreshold = 0.5 ;\np : Prop ;\np = every (x : Tensor Real [1]) . let y = f x in y ! 0 >= threshold ;\n",
        IDENTITY_NETWORK
    );
    let queries = compile(&source).unwrap();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].smtlib.contains("(>= Y0 0.5)"));
}

#[test]
fn some_quantifier_emits_exists() {
    let source = format!(
        "{}p : Prop ;\np = some (x : Tensor Real [1]) . let y = f x in y ! 0 >= 0.0 ;\n",
        IDENTITY_NETWORK
    );
    let queries = compile(&source).unwrap();
    assert!(queries[0].smtlib.contains("(exists ((x!0 Real))"));
}

#[test]
fn binder_renaming_does_not_change_normal_forms() {
    // Alpha-equivalence congruence: binder names are printing hints only.
    let original = format!(
        "{}p : Prop ;\np = every (x : Tensor Real [1]) . let y = f x in y ! 0 >= 0.0 ;\n",
        IDENTITY_NETWORK
    );
    let renamed = format!(
        "{}p : Prop ;\np = every (input : Tensor Real [1]) . let out = f input in out ! 0 >= 0.0 ;\n",
        IDENTITY_NETWORK
    );
    let (prog_a, _) = normalise(&original);
    let (prog_b, _) = normalise(&renamed);
    assert!(debruijn::alpha_eq(
        decl_body(&prog_a, "p"),
        decl_body(&prog_b, "p")
    ));
}

#[test]
fn multiple_properties_emit_multiple_queries() {
    let source = format!(
        "{}p : Prop ;\np = every (x : Tensor Real [1]) . let y = f x in y ! 0 >= 0.0 ;\nq : Prop ;\nq = every (x : Tensor Real [1]) . let y = f x in y ! 0 <= 1.0 ;\n",
        IDENTITY_NETWORK
    );
    let queries = compile(&source).unwrap();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].property.as_str(), "p");
    assert_eq!(queries[1].property.as_str(), "q");
}
