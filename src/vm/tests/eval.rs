//! Evaluation semantics, checked through both execution paths

use super::{expect_out, run_both};

#[tokio::test]
async fn test_operator_precedence() {
    expect_out("print 5 + 3 * 2", "11\n").await;
    expect_out("print 10 - 2 - 3", "5\n").await;
    expect_out("print 8 / 2 / 2", "2\n").await;
    expect_out("print 1 + 2 = 3", "true\n").await;
    expect_out("print (1 + 2) * 3", "9\n").await;
}

#[tokio::test]
async fn test_unary_minus() {
    expect_out("print -5", "-5\n").await;
    expect_out("print 2 * -3", "-6\n").await;
    expect_out("print - 4", "-4\n").await;
    expect_out("make \"x 7 print -:x", "-7\n").await;
}

#[tokio::test]
async fn test_comparison_operators() {
    expect_out("print 2 < 3", "true\n").await;
    expect_out("print 2 >= 3", "false\n").await;
    expect_out("print 2 <> 3", "true\n").await;
    expect_out("print \"a = \"A", "true\n").await;
}

#[tokio::test]
async fn test_repeat_and_repcount() {
    expect_out("repeat 3 [print \"hi]", "hi\nhi\nhi\n").await;
    expect_out("repeat 3 [print repcount]", "1\n2\n3\n").await;
    expect_out("print repcount", "-1\n").await;
}

#[tokio::test]
async fn test_for_ranges_no_overshoot() {
    expect_out("for [i 1 5 2] [print :i]", "1\n3\n5\n").await;
    expect_out("for [i 5 1] [print :i]", "5\n4\n3\n2\n1\n").await;
    expect_out("for [i 1 0] [print :i]", "1\n0\n").await;
    expect_out("for [i 10 1 -4] [print :i]", "10\n6\n2\n").await;
}

#[tokio::test]
async fn test_for_leaves_no_binding_behind() {
    // `for` carries STASH_LOCAL_VAR: the loop variable is restored away
    let (_, err) = run_both("for [q 1 2] [print :q]\nprint :q").await;
    assert!(err.contains("q has no value"), "got: {}", err);
}

#[tokio::test]
async fn test_if_and_ifelse() {
    expect_out("if \"true [print \"yes]", "yes\n").await;
    expect_out("if \"false [print \"yes]", "").await;
    expect_out("ifelse 1 = 2 [print \"a] [print \"b]", "b\n").await;
    // list-level if … else … folds into ifelse
    expect_out("if 1 = 1 [print \"a] else [print \"b]", "a\n").await;
    expect_out("print ifelse 2 > 1 [\"big] [\"small]", "big\n").await;
}

#[tokio::test]
async fn test_while_until() {
    expect_out(
        "make \"i 0 while [:i < 3] [print :i make \"i :i + 1]",
        "0\n1\n2\n",
    )
    .await;
    expect_out(
        "make \"i 0 until [:i = 2] [make \"i :i + 1] print :i",
        "2\n",
    )
    .await;
}

#[tokio::test]
async fn test_test_iftrue_iffalse() {
    expect_out("test 1 < 2 iftrue [print \"t] iffalse [print \"f]", "t\n").await;
}

#[tokio::test]
async fn test_procedures_output_and_redefinition() {
    expect_out("to f :x\noutput :x + 1\nend\nprint f 5", "6\n").await;
    expect_out(
        "to f :x\noutput :x + 1\nend\nprint f 5\nto f :x\noutput :x * 10\nend\nprint f 5",
        "6\n50\n",
    )
    .await;
}

#[tokio::test]
async fn test_recursion() {
    expect_out(
        "to fact :n\nif :n = 0 [output 1]\noutput :n * fact :n - 1\nend\nprint fact 5",
        "120\n",
    )
    .await;
}

#[tokio::test]
async fn test_stop_returns_early() {
    expect_out(
        "to f :n\nif :n > 2 [stop]\nprint :n\nend\nf 1\nf 9",
        "1\n",
    )
    .await;
}

#[tokio::test]
async fn test_optional_and_rest_parameters() {
    expect_out(
        "to greet :name [:greeting \"hello]\nprint (sentence :greeting :name)\nend\ngreet \"world\n(greet \"world \"hi)",
        "hello world\nhi world\n",
    )
    .await;
    expect_out(
        "to gather :first [:rest]\nprint :first print :rest\nend\n(gather 1 2 3)",
        "1\n2 3\n",
    )
    .await;
}

#[tokio::test]
async fn test_default_templates_see_earlier_params() {
    expect_out(
        "to f :a [:b :a + 1]\nprint :b\nend\nf 10",
        "11\n",
    )
    .await;
}

#[tokio::test]
async fn test_dynamic_scoping() {
    expect_out(
        "to inner\nprint :x\nend\nto outer\nlocalmake \"x 42\ninner\nend\nouter",
        "42\n",
    )
    .await;
    // make with no existing binding creates a global
    expect_out(
        "to setter\nmake \"g 7\nend\nsetter\nprint :g",
        "7\n",
    )
    .await;
}

#[tokio::test]
async fn test_catch_throw_value() {
    expect_out("print catch \"foo [throw \"foo 42]", "42\n").await;
    expect_out("catch \"done [print 1 throw \"done print 9]\nprint 2", "1\n2\n").await;
    // tags match case-insensitively
    expect_out("print catch \"FOO [throw \"foo 1]", "1\n").await;
}

#[tokio::test]
async fn test_catch_error_swallows_errors_only() {
    expect_out("catch \"error [print first []]\nprint \"ok", "ok\n").await;
    // stop/output pass through a catch to the procedure boundary
    expect_out(
        "to f\ncatch \"error [output 5]\noutput 9\nend\nprint f",
        "5\n",
    )
    .await;
}

#[tokio::test]
async fn test_run_and_runresult() {
    expect_out("print run [1 + 2]", "3\n").await;
    expect_out("run [print \"hi]", "hi\n").await;
    expect_out("show runresult [1 + 2]", "[3]\n").await;
    expect_out("show runresult [ignore 1]", "[]\n").await;
}

#[tokio::test]
async fn test_apply_invoke_templates() {
    expect_out("print apply [[x] :x * :x] [7]", "49\n").await;
    expect_out("print apply \"sum [3 4]", "7\n").await;
    expect_out("print (invoke [? + ?2] 10 20)", "30\n").await;
    expect_out("foreach [a b] [print ?]", "a\nb\n").await;
}

#[tokio::test]
async fn test_macro_expands_in_caller() {
    // the expansion list runs in the caller's scope, so it sees and
    // rebinds the caller's local x
    expect_out(
        ".macro doublex\noutput [make \"x :x * 2]\nend\n\
         to f\nlocalmake \"x 5\ndoublex\noutput :x\nend\nprint f",
        "10\n",
    )
    .await;
}

#[tokio::test]
async fn test_paren_variadic_calls() {
    expect_out("print (sum 1 2 3 4)", "10\n").await;
    expect_out("print (word \"a \"b \"c)", "abc\n").await;
    expect_out("(print 1 2 3)", "1 2 3\n").await;
    expect_out("show (list 1 [2] 3)", "[1 [2] 3]\n").await;
}

#[tokio::test]
async fn test_words_and_lists() {
    expect_out("print first [a b c]", "a\n").await;
    expect_out("show butfirst [a b c]", "[b c]\n").await;
    expect_out("print first \"hello", "h\n").await;
    expect_out("print count [a b c]", "3\n").await;
    expect_out("print item 2 [a b c]", "b\n").await;
    expect_out("show fput 1 [2 3]", "[1 2 3]\n").await;
    expect_out("show lput 3 [1 2]", "[1 2 3]\n").await;
    expect_out("print word \"fu \"bar", "fubar\n").await;
    expect_out("show sentence [a b] [c]", "[a b c]\n").await;
    expect_out("print emptyp []", "true\n").await;
}

#[tokio::test]
async fn test_arrays_with_origin() {
    expect_out(
        "make \"a array 3\nsetitem 1 :a \"x\nprint item 1 :a",
        "x\n",
    )
    .await;
    expect_out(
        "make \"a (array 2 0)\nsetitem 0 :a \"z\nprint item 0 :a",
        "z\n",
    )
    .await;
    expect_out("show arraytolist {1 2 3}", "[1 2 3]\n").await;
}

#[tokio::test]
async fn test_bar_word_round_trip() {
    // |a b| keeps its embedded space, bars stripped on display
    expect_out("print \"|a b|", "a b\n").await;
    expect_out("print count \"|a b|", "3\n").await;
}

#[tokio::test]
async fn test_number_display() {
    expect_out("print 0.1 + 0.2", "0.3\n").await;
    expect_out("print 1 / 3", "0.333333333333333\n").await;
    expect_out("print 10 / 2", "5\n").await;
    expect_out("print 1.5e2", "150\n").await;
}

#[tokio::test]
async fn test_property_lists() {
    expect_out(
        "pprop \"pet \"sound \"meow\nprint gprop \"pet \"sound\nshow plist \"pet",
        "meow\n[sound meow]\n",
    )
    .await;
}

#[tokio::test]
async fn test_define_and_text() {
    expect_out(
        "define \"double [[x] [output :x * 2]]\nprint double 21",
        "42\n",
    )
    .await;
    expect_out(
        "to f :x\noutput :x\nend\nshow first text \"f",
        "[x]\n",
    )
    .await;
}

#[tokio::test]
async fn test_modules_and_classes() {
    expect_out(
        "module \"m\nto hi\nprint \"hello\nend\nexport \"hi\nendmodule\nimport \"m\nhi",
        "hello\n",
    )
    .await;
    expect_out(
        "class \"animal\nto speak\nprint \"generic\nend\nexport \"speak\nendclass\n\
         class \"dog \"animal\nto bark\nspeak\nend\nexport \"bark\nendclass\n\
         import \"dog\nbark",
        "generic\n",
    )
    .await;
}

#[tokio::test]
async fn test_turtle_commands_recorded() {
    use crate::util::config::EngineConfig;
    use crate::vm::Session;
    let (mut session, handles) = Session::sandbox(EngineConfig::default());
    session.execute("forward 10 right 90 forward 5").await;
    let cmds = handles.draw.commands();
    assert!(cmds[0].starts_with("[\"line\""), "got {:?}", cmds);
    // draw command streams are identical across execution modes
    let mut config = EngineConfig::default();
    config.exec.mode = crate::util::config::ExecMode::Interpret;
    let (mut s2, h2) = Session::sandbox(config);
    s2.execute("forward 10 right 90 forward 5").await;
    assert_eq!(cmds, h2.draw.commands());
}
