#[cfg(test)]
mod program_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use ling::error::RunError;
    use ling::runner::run;
    use pretty_assertions::assert_eq;

    /// `print` sink that the test can read back after the run.
    #[derive(Clone, Default)]
    struct Capture(Rc<RefCell<Vec<u8>>>);

    impl Capture {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).expect("output is UTF-8")
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run_source(source: &str) -> (String, Result<(), RunError>) {
        let capture = Capture::default();
        let result = run(source, capture.clone());

        (capture.contents(), result)
    }

    fn output(source: &str) -> String {
        let (out, result) = run_source(source);

        if let Err(e) = result {
            panic!("program failed: {:?}\noutput so far:\n{}", e, out);
        }

        out
    }

    /// Output printed before the failure, and the rendered runtime error.
    fn runtime_error(source: &str) -> (String, String) {
        let (out, result) = run_source(source);

        match result {
            Err(e @ RunError::Runtime(_)) => {
                assert_eq!(e.exit_code(), 70);
                (out, e.to_string())
            }
            other => panic!("expected a runtime error, got {:?}", other),
        }
    }

    fn compile_errors(source: &str) -> Vec<String> {
        let (out, result) = run_source(source);

        assert_eq!(out, "", "nothing may run when compilation fails");

        match result {
            Err(e @ RunError::Compile(_)) => {
                assert_eq!(e.exit_code(), 65);
                match e {
                    RunError::Compile(errors) => errors.iter().map(ToString::to_string).collect(),
                    RunError::Runtime(_) => unreachable!(),
                }
            }
            other => panic!("expected compile errors, got {:?}", other),
        }
    }

    // ─────────────────────────── expressions ───────────────────────────

    #[test]
    fn arithmetic_follows_precedence_and_prints_shortest_form() {
        assert_eq!(
            output("print 1 + 2 * 3; print (1 + 2) * 3; print 10 / 4; print -3 - -1; print -0;"),
            "7\n9\n2.5\n-2\n-0\n"
        );
    }

    #[test]
    fn division_by_zero_aborts_the_run() {
        let (out, err) = runtime_error("print 1;\nprint 1 / 0;\nprint 2;");

        assert_eq!(out, "1\n");
        assert_eq!(err, "Cannot divide by 0.\n[line 2]");
    }

    #[test]
    fn plus_concatenates_strings_and_numbers() {
        assert_eq!(
            output(r#"print "a" + "b"; print "x" + 1; print 1 + "x"; print "n" + 2.5;"#),
            "ab\nx1\n1x\nn2.5\n"
        );

        let (_, err) = runtime_error("print true + 1;");
        assert_eq!(err, "Operands must be two numbers or two strings.\n[line 1]");
    }

    #[test]
    fn equality_and_truthiness() {
        assert_eq!(
            output(
                r#"
                print nil == nil;
                print nil == false;
                print 1 == 1;
                print "a" != "a";
                print !0;
                print !"";
                print !nil;
                "#
            ),
            "true\nfalse\ntrue\nfalse\nfalse\nfalse\ntrue\n"
        );
    }

    #[test]
    fn logical_operators_short_circuit_and_yield_operands() {
        // `boom` is never evaluated.
        assert_eq!(
            output(r#"print nil or "x"; print 1 and 2; print false and boom; print "t" or boom;"#),
            "x\n2\nfalse\nt\n"
        );
    }

    #[test]
    fn values_print_by_kind() {
        assert_eq!(
            output("fun f() {} class K {} print f; print clock; print K; print K(); print nil; print true;"),
            "<fn f>\n<native fn>\nK\nK instance\nnil\ntrue\n"
        );
    }

    #[test]
    fn clock_is_a_number() {
        assert_eq!(output("print clock() > 0;"), "true\n");
    }

    #[test]
    fn globals_may_be_initialized_from_natives() {
        assert_eq!(output("var clock = clock; print clock;"), "<native fn>\n");
    }

    // ──────────────────────────── scoping ─────────────────────────────

    #[test]
    fn inner_block_shadows_global() {
        assert_eq!(
            output(r#"var a = "global"; { var a = "local"; print a; } print a;"#),
            "local\nglobal\n"
        );
    }

    #[test]
    fn closures_bind_to_the_scope_they_were_declared_in() {
        let source = r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
        "#;

        assert_eq!(output(source), "global\nglobal\n");
    }

    #[test]
    fn separately_created_closures_keep_independent_state() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    return i;
                }
                return count;
            }

            var a = makeCounter();
            var b = makeCounter();
            print a();
            print a();
            print b();
        "#;

        assert_eq!(output(source), "1\n2\n1\n");
    }

    #[test]
    fn return_unwinds_nested_blocks_and_loops() {
        let source = r#"
            var a = "outer";
            fun find() {
                for (var i = 0; i < 10; i = i + 1) {
                    while (true) {
                        var a = "inner";
                        if (i == 4) return i;
                        break;
                    }
                }
                return -1;
            }
            print find();
            print a;
        "#;

        assert_eq!(output(source), "4\nouter\n");
    }

    #[test]
    fn recursion() {
        let source = r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(15);
        "#;

        assert_eq!(output(source), "610\n");
    }

    #[test]
    fn deep_recursion_completes() {
        let source = r#"
            fun down(n) {
                if (n > 0) return down(n - 1);
                return 0;
            }
            fun count(n) {
                if (n == 0) return 0;
                return 1 + count(n - 1);
            }
            print down(10000);
            print count(10000);
        "#;

        assert_eq!(output(source), "0\n10000\n");
    }

    #[test]
    fn deeply_nested_expressions_parse_and_evaluate() {
        let depth = 1500;
        let source = format!("print {}1{};", "(".repeat(depth), ")".repeat(depth));

        assert_eq!(output(&source), "1\n");
    }

    // ───────────────────────────── loops ──────────────────────────────

    #[test]
    fn break_leaves_only_the_innermost_loop() {
        let source = r#"
            for (var i = 0; i < 3; i = i + 1) {
                var j = 0;
                while (true) {
                    if (j == 1) break;
                    j = j + 1;
                }
                print i + j;
            }
        "#;

        assert_eq!(output(source), "1\n2\n3\n");
    }

    #[test]
    fn continue_in_for_skips_the_increment() {
        // The increment is the tail of the loop body, so `continue` jumps
        // past it and `i` stays at 1 until the guard breaks out.
        let source = r#"
            var n = 0;
            for (var i = 0; i < 3; i = i + 1) {
                n = n + 1;
                if (n > 10) break;
                if (i == 1) continue;
                print i;
            }
            print n;
        "#;

        assert_eq!(output(source), "0\n11\n");
    }

    #[test]
    fn continue_in_while_goes_back_to_the_condition() {
        let source = r#"
            var i = 0;
            while (i < 5) {
                i = i + 1;
                if (i == 2) continue;
                print i;
            }
        "#;

        assert_eq!(output(source), "1\n3\n4\n5\n");
    }

    #[test]
    fn continue_inside_a_called_function_does_not_touch_the_outer_loop() {
        let source = r#"
            var count = 0;
            for (var i = 0; i < 3; i = i + 1) {
                fun inner() {
                    var j = 0;
                    while (j < 5) {
                        j = j + 1;
                        if (j > 1) continue;
                    }
                }
                inner();
                count = count + 1;
            }
            print count;
        "#;

        assert_eq!(output(source), "3\n");
    }

    // ──────────────────────────── classes ─────────────────────────────

    #[test]
    fn initializer_and_methods() {
        let source = r#"
            class A {
                init(x) { this.x = x; }
                getX() { return this.x; }
            }
            var a = A(1);
            print a.getX();
        "#;

        assert_eq!(output(source), "1\n");

        let (out, err) = runtime_error(&format!("{}\nprint a.getX(2);", source));
        assert_eq!(out, "1\n");
        assert_eq!(err, "Expected 0 arguments but got 1.\n[line 9]");
    }

    #[test]
    fn class_arity_comes_from_init() {
        let (_, err) = runtime_error("class P { init(a, b) {} }\nP(1);");

        assert_eq!(err, "Expected 2 arguments but got 1.\n[line 2]");
    }

    #[test]
    fn initializer_always_yields_the_instance() {
        let source = r#"
            class P {
                init() { this.v = 1; return; }
            }
            var p = P();
            print p.init();
            print p.v;
        "#;

        assert_eq!(output(source), "P instance\n1\n");
    }

    #[test]
    fn fields_shadow_methods_and_set_never_checks() {
        let source = r#"
            class Q { m() { return "method"; } }
            var q = Q();
            print q.m();
            q.m = "field";
            print q.m;
        "#;

        assert_eq!(output(source), "method\nfield\n");
    }

    #[test]
    fn bound_methods_remember_their_instance() {
        let source = r#"
            class Box {
                init(v) { this.v = v; }
                get() { return this.v; }
            }
            var getter = Box("kept").get;
            print getter();
        "#;

        assert_eq!(output(source), "kept\n");
    }

    #[test]
    fn methods_can_name_their_own_class() {
        assert_eq!(
            output("class Node { make() { return Node(); } } print Node().make();"),
            "Node instance\n"
        );
    }

    #[test]
    fn subclasses_inherit_methods_and_init() {
        let source = r#"
            class A {
                init(x) { this.x = x; }
                hello() { return "hello " + this.x; }
            }
            class B < A {}
            print B(5).hello();
        "#;

        assert_eq!(output(source), "hello 5\n");
    }

    #[test]
    fn super_resolves_against_the_declaring_class() {
        let source = r#"
            class A { method() { print "A method"; } }
            class B < A {
                method() { print "B method"; }
                test() { super.method(); }
            }
            class C < B {
                method() { print "C method"; }
            }
            C().test();
        "#;

        assert_eq!(output(source), "A method\n");
    }

    #[test]
    fn super_init_chains_constructors() {
        let source = r#"
            class A { init() { this.tag = "A"; } }
            class B < A {
                init() {
                    super.init();
                    this.tag = this.tag + "B";
                }
            }
            print B().tag;
        "#;

        assert_eq!(output(source), "AB\n");
    }

    // ───────────────────────── runtime errors ─────────────────────────

    #[test]
    fn runtime_errors_report_message_then_line() {
        let cases = [
            ("print nope;", "Undefined variable 'nope'.\n[line 1]"),
            ("nope = 1;", "Undefined variable 'nope'.\n[line 1]"),
            ("\n\"s\"();", "Can only call functions and classes.\n[line 2]"),
            ("var x = 1; print x.y;", "Only instances have properties.\n[line 1]"),
            ("var x = 1; x.y = 2;", "Only instances have fields.\n[line 1]"),
            ("class E {} print E().nope;", "Undefined property 'nope'.\n[line 1]"),
            ("var N = 1;\nclass S < N {}", "Superclass must be a class.\n[line 2]"),
            ("print -\"a\";", "Operand must be a number.\n[line 1]"),
            ("print 1 < \"a\";", "Operands must be numbers.\n[line 1]"),
            (
                "class A {} class B < A { m() { return super.gone(); } } B().m();",
                "Undefined property 'gone'.\n[line 1]",
            ),
        ];

        for (source, expected) in cases {
            let (_, err) = runtime_error(source);
            assert_eq!(err, expected, "source: {}", source);
        }
    }

    // ───────────────────────── compile errors ─────────────────────────

    #[test]
    fn syntax_errors_accumulate_and_block_execution() {
        assert_eq!(
            compile_errors("print \"before\";\nprint ;\nvar = 1;\nprint \"ok\";"),
            vec![
                "[line 2] Error at ';': Expect expression.",
                "[line 3] Error at '=': Expect variable name.",
            ]
        );
    }

    #[test]
    fn lexical_and_syntax_errors_are_reported_together() {
        assert_eq!(
            compile_errors("print @;"),
            vec![
                "[line 1] Error: Unexpected character.",
                "[line 1] Error at ';': Expect expression.",
            ]
        );
    }

    #[test]
    fn missing_semicolon_points_at_end() {
        assert_eq!(
            compile_errors("print 1"),
            vec!["[line 1] Error at end: Expect ';' after value."]
        );
    }

    #[test]
    fn global_self_initializer_is_a_static_error() {
        assert_eq!(
            compile_errors("print \"before\";\nvar a = a;"),
            vec!["[line 2] Error at 'a': Can't read local variable in its own initializer."]
        );
    }

    #[test]
    fn static_errors_cover_misplaced_keywords() {
        assert_eq!(
            compile_errors(
                "break;\ncontinue;\nreturn 1;\nprint this;\nclass A < A {}\nclass B { init() { return 1; } }"
            ),
            vec![
                "[line 1] Error at 'break': Must use break inside of a loop.",
                "[line 2] Error at 'continue': Must use continue inside of a loop.",
                "[line 3] Error at 'return': Can't return from top-level code.",
                "[line 4] Error at 'this': Can't use 'this' outside of a class.",
                "[line 5] Error at 'A': A class can't inherit from itself.",
                "[line 6] Error at 'return': Can't return a value from an initializer.",
            ]
        );
    }

    // ─────────────────────────── determinism ──────────────────────────

    #[test]
    fn independent_runs_print_identical_output() {
        let source = r#"
            class Counter {
                init() { this.n = 0; }
                tick() { this.n = this.n + 1; return this; }
            }
            var c = Counter();
            for (var i = 0; i < 4; i = i + 1) c.tick();
            print c.n;
            print "done " + c.n;
        "#;

        let first = output(source);
        let second = output(source);

        assert_eq!(first, "4\ndone 4\n");
        assert_eq!(first, second);
    }

    #[test]
    fn globals_do_not_leak_between_runs() {
        assert_eq!(output("var leaked = 1;"), "");

        let (_, err) = runtime_error("print leaked;");
        assert_eq!(err, "Undefined variable 'leaked'.\n[line 1]");
    }
}
