//! End-to-end tests: generate procedures, run them on the reference
//! executor and inspect scores and storage.

use mcfc_codegen::{Compiler, Element, Generated, Kind, Param, ProcKind};
use mcfc_types::{Config, ErrorCode};
use mcfc_vm::{Limits, Machine, Nbt};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn compiler() -> Compiler {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Compiler::new(Config::with_namespace("t"))
}

/// Load every procedure, run init and then `entry`.
fn run(out: &Generated, entry: &str) -> Machine {
    let mut vm = Machine::new(Limits::default());
    for p in &out.procedures {
        vm.load(p.signature.clone(), p.lines.clone());
    }
    vm.run(&out.init).expect("init failed");
    vm.run(entry).expect("entry failed");
    vm
}

fn stored<'a>(vm: &'a Machine, path: &str) -> Option<&'a Nbt> {
    vm.data("t:mcf", path)
}

fn sys(vm: &Machine, register: &str) -> Option<i32> {
    vm.score(register, "t.sys")
}

// ══════════════════════════════════════════════════════════════════════════════
// Values
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn integer_sum_is_retrievable_and_nothing_leaks() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let a = cx.int(2);
        let b = cx.int(3);
        let c = cx.add(&a, &b);
        cx.move_out(&c, "out.c");
        cx.release(&c);
    });
    let out = cx.finish().unwrap();
    assert!(out.leaked.is_empty());

    let vm = run(&out, "t:main");
    assert_eq!(stored(&vm, "out.c"), Some(&Nbt::Int(5)));
}

#[test]
fn arithmetic_follows_floor_semantics() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let a = cx.int(-7);
        let q = cx.div(&a, 2);
        let r = cx.rem(&a, 2);
        let m = cx.abs(&a);
        let n = cx.neg(&m);
        for (value, path) in [(&q, "out.q"), (&r, "out.r"), (&m, "out.m"), (&n, "out.n")] {
            cx.move_out(value, path);
        }
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(stored(&vm, "out.q"), Some(&Nbt::Int(-4)));
    assert_eq!(stored(&vm, "out.r"), Some(&Nbt::Int(1)));
    assert_eq!(stored(&vm, "out.m"), Some(&Nbt::Int(7)));
    assert_eq!(stored(&vm, "out.n"), Some(&Nbt::Int(-7)));
}

#[test]
fn conditions_combine() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let a = cx.int(4);
        let big = cx.gt(&a, 3);
        let odd = cx.eq(&a, 5);
        let both = cx.and(&big, &odd);
        let either = cx.or(&big, &odd);
        let neither = cx.not(&either);
        cx.move_out(&both, "out.both");
        cx.move_out(&either, "out.either");
        cx.move_out(&neither, "out.neither");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(stored(&vm, "out.both"), Some(&Nbt::Byte(0)));
    assert_eq!(stored(&vm, "out.either"), Some(&Nbt::Byte(1)));
    assert_eq!(stored(&vm, "out.neither"), Some(&Nbt::Byte(0)));
}

#[test]
fn text_concat_length_and_equality() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let a = cx.text("mine");
        let b = cx.text("craft");
        let ab = cx.concat(&a, &b);
        let n = cx.len(&ab);
        let expected = cx.text("minecraft");
        let same = cx.eq(&ab, &expected);
        let differs = cx.ne(&a, &b);
        cx.move_out(&ab, "out.text");
        cx.move_out(&n, "out.len");
        cx.move_out(&same, "out.same");
        cx.move_out(&differs, "out.differs");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(stored(&vm, "out.text"), Some(&Nbt::String("minecraft".into())));
    assert_eq!(stored(&vm, "out.len"), Some(&Nbt::Int(9)));
    assert_eq!(stored(&vm, "out.same"), Some(&Nbt::Byte(1)));
    assert_eq!(stored(&vm, "out.differs"), Some(&Nbt::Byte(1)));
}

#[test]
fn list_operations() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let list = cx.list(Element::Integer);
        for n in [10, 20, 30] {
            let item = cx.int(n);
            cx.list_push(&list, &item);
        }
        let one = cx.int(1);
        let second = cx.list_get(&list, &one);
        let replacement = cx.int(99);
        cx.list_set(&list, &one, &replacement);
        let last = cx.list_pop(&list);
        let len = cx.len(&list);
        cx.move_out(&second, "out.second");
        cx.move_out(&last, "out.last");
        cx.move_out(&len, "out.len");
        cx.move_out(&list, "out.list");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(stored(&vm, "out.second"), Some(&Nbt::Int(20)));
    assert_eq!(stored(&vm, "out.last"), Some(&Nbt::Int(30)));
    assert_eq!(stored(&vm, "out.len"), Some(&Nbt::Int(2)));
    assert_eq!(
        stored(&vm, "out.list"),
        Some(&Nbt::List(vec![Nbt::Int(10), Nbt::Int(99)]))
    );
}

#[test]
fn float_literal_extracts_exactly() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let f = cx.float("3.25");
        cx.extract(&f, "out.f");
        let g = cx.float("-0.5");
        cx.extract(&g, "out.g");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(stored(&vm, "out.f"), Some(&Nbt::Double(3.25)));
    assert_eq!(stored(&vm, "out.g"), Some(&Nbt::Double(-0.5)));
}

#[test]
fn collect_then_move_restores_storage() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let list = cx.list(Element::Text);
        cx.collect_in(&list, "in.words");
        cx.move_out(&list, "out.words");
        let n = cx.int(0);
        cx.collect_in(&n, "in.n");
        cx.move_out(&n, "out.n");
    });
    let out = cx.finish().unwrap();
    let mut vm = Machine::default();
    for p in &out.procedures {
        vm.load(p.signature.clone(), p.lines.clone());
    }
    vm.run(&out.init).unwrap();
    vm.execute_line(r#"data modify storage t:mcf in set value {words:["a","b"],n:42}"#)
        .unwrap();
    vm.run("t:main").unwrap();
    assert_eq!(stored(&vm, "out.words"), stored(&vm, "in.words"));
    assert_eq!(stored(&vm, "out.n"), Some(&Nbt::Int(42)));
}

// ══════════════════════════════════════════════════════════════════════════════
// Control flow
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn branch_chain_runs_only_the_second_branch() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let hits = cx.int(0);
        let x = cx.int(5);
        let first = cx.lt(&x, 0);
        let second = cx.eq(&x, 5);
        cx.if_(&first, |cx| cx.add_assign(&hits, 1));
        cx.elif(&second, |cx| cx.add_assign(&hits, 10));
        cx.else_(|cx| cx.add_assign(&hits, 100));
        cx.move_out(&hits, "out.hits");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(stored(&vm, "out.hits"), Some(&Nbt::Int(10)));
    assert_eq!(stored(&vm, "cond_stack"), Some(&Nbt::List(vec![])));
}

#[test]
fn nested_chain_does_not_clobber_outer_marker() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let hits = cx.int(0);
        let yes = cx.boolean(true);
        let no = cx.boolean(false);
        cx.if_(&yes, |cx| {
            cx.if_(&no, |cx| cx.add_assign(&hits, 1));
            cx.else_(|cx| cx.add_assign(&hits, 2));
        });
        cx.else_(|cx| cx.add_assign(&hits, 100));
        cx.move_out(&hits, "out.hits");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(stored(&vm, "out.hits"), Some(&Nbt::Int(2)));
}

#[test]
fn range_break_stops_after_three_bodies() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let runs = cx.int(0);
        cx.for_range(0, 5, 1, |cx, i| {
            let stop = cx.eq(i, 3);
            cx.if_(&stop, |cx| cx.break_());
            cx.add_assign(&runs, 1);
        });
        cx.move_out(&runs, "out.runs");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(stored(&vm, "out.runs"), Some(&Nbt::Int(3)));
    assert_eq!(sys(&vm, "#loop_exit"), Some(0));
    assert_eq!(sys(&vm, "#loop_cont"), Some(0));
    assert_eq!(stored(&vm, "stack"), Some(&Nbt::List(vec![])));
}

#[test]
fn range_continue_skips_rest_of_body() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let sum = cx.int(0);
        cx.for_range(10, 0, -2, |cx, i| {
            let skip = cx.eq(i, 6);
            cx.if_(&skip, |cx| cx.continue_());
            cx.add_assign(&sum, i);
        });
        cx.move_out(&sum, "out.sum");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    // 10 + 8 + 4 + 2
    assert_eq!(stored(&vm, "out.sum"), Some(&Nbt::Int(24)));
}

#[test]
fn while_loop_with_dynamic_condition() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let n = cx.int(1);
        let steps = cx.int(0);
        cx.while_(
            |cx| cx.lt(&n, 100),
            |cx| {
                cx.mul_assign(&n, 3);
                cx.add_assign(&steps, 1);
            },
        );
        cx.move_out(&n, "out.n");
        cx.move_out(&steps, "out.steps");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(stored(&vm, "out.n"), Some(&Nbt::Int(243)));
    assert_eq!(stored(&vm, "out.steps"), Some(&Nbt::Int(5)));
}

#[test]
fn range_over_value_bounds() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let lo = cx.int(3);
        let hi = cx.int(7);
        let total = cx.int(0);
        cx.for_range(&lo, &hi, 1, |cx, i| cx.add_assign(&total, i));
        cx.move_out(&total, "out.total");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(stored(&vm, "out.total"), Some(&Nbt::Int(18)));
}

#[test]
fn loop_depth_is_bounded_by_runtime_recursion() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        cx.for_range(0, 10_000, 1, |_, _| {});
    });
    let out = cx.finish().unwrap();
    let mut vm = Machine::new(Limits {
        max_depth: 64,
        max_commands: 1_000_000,
    });
    for p in &out.procedures {
        vm.load(p.signature.clone(), p.lines.clone());
    }
    vm.run(&out.init).unwrap();
    assert!(vm.run("t:main").is_err());
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions and classes
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn recursive_fibonacci() {
    let mut cx = compiler();
    let fib = cx.function(
        "fib",
        &[Param::value(Kind::Integer)],
        Some(Kind::Integer),
        |cx, params| {
            let n = &params[0];
            let small = cx.lt(n, 2);
            cx.if_(&small, |cx| cx.return_(Some(n)));
            let this = cx.current_function().unwrap();
            let a = cx.sub(n, 1);
            let fa = cx.call(this, &[&a]).unwrap();
            let b = cx.sub(n, 2);
            let fb = cx.call(this, &[&b]).unwrap();
            let sum = cx.add(&fa, &fb);
            cx.return_(Some(&sum));
        },
    );
    cx.entry("main", |cx| {
        let ten = cx.int(10);
        let result = cx.call(fib, &[&ten]).unwrap();
        cx.move_out(&result, "out.fib");
        cx.move_out(&ten, "out.arg");
    });
    let out = cx.finish().unwrap();
    assert_eq!(out.procedures_of_kind(ProcKind::FunctionBody).count(), 1);

    let vm = run(&out, "t:main");
    assert_eq!(stored(&vm, "out.fib"), Some(&Nbt::Int(55)));
    assert_eq!(stored(&vm, "out.arg"), Some(&Nbt::Int(10)));
    assert_eq!(sys(&vm, "#terminate"), Some(0));
    assert_eq!(stored(&vm, "stack"), Some(&Nbt::List(vec![])));
}

#[test]
fn alias_parameter_writes_back() {
    let mut cx = compiler();
    let bump = cx.function(
        "bump",
        &[Param::alias(Kind::Integer), Param::value(Kind::Integer)],
        None,
        |cx, params| {
            cx.add_assign(&params[0], 5);
            cx.add_assign(&params[1], 5);
        },
    );
    cx.entry("main", |cx| {
        let a = cx.int(1);
        let b = cx.int(1);
        cx.call(bump, &[&a, &b]);
        cx.move_out(&a, "out.a");
        cx.move_out(&b, "out.b");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(stored(&vm, "out.a"), Some(&Nbt::Int(6)));
    assert_eq!(stored(&vm, "out.b"), Some(&Nbt::Int(1)));
}

#[test]
fn return_inside_loop_unwinds_every_level() {
    let mut cx = compiler();
    let first_over = cx.function(
        "first_over",
        &[Param::value(Kind::Integer)],
        Some(Kind::Integer),
        |cx, params| {
            let limit = &params[0];
            cx.for_range(0, 100, 1, |cx, i| {
                let square = cx.mul(i, i);
                let over = cx.gt(&square, limit);
                cx.if_(&over, |cx| cx.return_(Some(i)));
            });
            let none = cx.int(-1);
            cx.return_(Some(&none));
        },
    );
    cx.entry("main", |cx| {
        let limit = cx.int(50);
        let found = cx.call(first_over, &[&limit]).unwrap();
        cx.move_out(&found, "out.found");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(stored(&vm, "out.found"), Some(&Nbt::Int(8)));
    assert_eq!(sys(&vm, "#terminate"), Some(0));
}

#[test]
fn method_mutates_instance_fields() {
    let mut cx = compiler();
    let counter = cx.define_class("Counter", &[("count", Kind::Integer), ("label", Kind::Text)]);
    let step = cx.method(
        counter,
        "step",
        &[Param::value(Kind::Integer)],
        None,
        |cx, this, params| {
            let by = params[0].clone();
            cx.with_fields(this, |cx, fields| {
                let count = cx.field(fields, "count");
                cx.add_assign(&count, &by);
            });
        },
    );
    cx.entry("main", |cx| {
        let a = cx.new_object(counter);
        let b = cx.new_object(counter);
        let three = cx.int(3);
        cx.call_method(&a, step, &[&three]);
        cx.call_method(&a, step, &[&three]);
        cx.call_method(&b, step, &[&three]);
        cx.move_out(&a, "out.a");
        cx.move_out(&b, "out.b");
    });
    let out = cx.finish().unwrap();
    assert_eq!(out.procedures_of_kind(ProcKind::Method).count(), 1);

    let vm = run(&out, "t:main");
    let count = |path: &str| match stored(&vm, path) {
        Some(Nbt::Compound(map)) => map.get("count").cloned(),
        _ => None,
    };
    assert_eq!(count("out.a"), Some(Nbt::Int(6)));
    assert_eq!(count("out.b"), Some(Nbt::Int(3)));
}

#[test]
fn loop_exit_inside_field_access_keeps_field_writes() {
    let mut cx = compiler();
    let counter = cx.define_class("Counter", &[("count", Kind::Integer)]);
    cx.entry("main", |cx| {
        let inner = cx.new_object(counter);
        let outer = cx.new_object(counter);
        cx.for_range(0, 5, 1, |cx, i| {
            cx.with_fields(&inner, |cx, fields| {
                let count = cx.field(fields, "count");
                cx.add_assign(&count, 1);
                let odd = cx.eq(i, 1);
                cx.if_(&odd, |cx| cx.continue_());
                let stop = cx.eq(i, 2);
                cx.if_(&stop, |cx| cx.break_());
            });
        });
        cx.with_fields(&outer, |cx, fields| {
            let count = cx.field(fields, "count");
            cx.for_range(0, 5, 1, |cx, i| {
                cx.add_assign(&count, 1);
                let stop = cx.eq(i, 1);
                cx.if_(&stop, |cx| cx.break_());
            });
        });
        cx.move_out(&inner, "out.inner");
        cx.move_out(&outer, "out.outer");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    let count = |path: &str| match stored(&vm, path) {
        Some(Nbt::Compound(map)) => map.get("count").cloned(),
        _ => None,
    };
    assert_eq!(count("out.inner"), Some(Nbt::Int(3)));
    assert_eq!(count("out.outer"), Some(Nbt::Int(2)));
}

// ══════════════════════════════════════════════════════════════════════════════
// Display
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn exec_as_body_shares_values_and_signals() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let hits = cx.int(0);
        let zombie = cx.entity("@e[type=zombie]");
        cx.for_range(0, 5, 1, |cx, i| {
            cx.exec_as(&zombie, true, |cx| {
                let stop = cx.eq(i, 2);
                cx.if_(&stop, |cx| cx.break_());
                cx.add_assign(&hits, 1);
            });
            cx.say("after");
        });
        cx.move_out(&hits, "out.hits");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(stored(&vm, "out.hits"), Some(&Nbt::Int(2)));
    assert_eq!(vm.output(), ["after", "after"]);
    assert_eq!(sys(&vm, "#loop_exit"), Some(0));
}

#[test]
fn tell_shows_runtime_values() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let n = cx.int(42);
        let f = cx.float("1.5");
        let everyone = cx.selector("@a");
        cx.tell(&everyone, &["n=".into(), (&n).into(), " f=".into(), (&f).into()]);
        cx.say("done");
    });
    let vm = run(&cx.finish().unwrap(), "t:main");
    assert_eq!(vm.output(), ["n=42 f=1.5d", "done"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Diagnostics
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn misuse_is_reported_and_generation_continues() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        cx.else_(|_| {});
        cx.break_();
        let t = cx.text("x");
        let n = cx.int(1);
        cx.add(&t, &n);
        cx.if_(&n, |_| {});
        cx.for_range(0, 3, 0, |_, _| {});
    });
    let failure = cx.finish().unwrap_err();
    let codes: Vec<ErrorCode> = failure.errors.errors.iter().map(|e| e.code).collect();
    assert_eq!(
        codes,
        [
            ErrorCode::ELSE_WITHOUT_BRANCH,
            ErrorCode::BREAK_OUTSIDE_LOOP,
            ErrorCode::UNSUPPORTED_OPERATION,
            ErrorCode::NOT_A_CONDITION,
            ErrorCode::ZERO_STEP,
        ]
    );
    assert!(failure.internal.is_empty());
    assert!(failure.errors.errors[0].site.file.ends_with("runtime_tests.rs"));
}

#[test]
fn stale_value_is_a_name_error() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let inner = cx.scope(|cx| cx.int(1));
        cx.add(&inner, 1);
    });
    let failure = cx.finish().unwrap_err();
    assert_eq!(failure.errors.errors[0].code, ErrorCode::UNKNOWN_IDENTITY);
}

#[test]
fn procedure_map_covers_every_procedure() {
    let mut cx = compiler();
    cx.entry("main", |cx| {
        let c = cx.boolean(true);
        cx.if_(&c, |cx| cx.say("yes"));
    });
    let out = cx.finish().unwrap();
    assert_eq!(out.procedure_map.entries.len(), out.procedures.len());
    let branch = out.procedure_map.by_kind(ProcKind::Branch).next().unwrap();
    assert!(branch.site.file.ends_with("runtime_tests.rs"));
    assert_eq!(out.procedure_map.find("t:main").unwrap().kind, ProcKind::Entry);
}
