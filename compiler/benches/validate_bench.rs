//! Benchmarks for the IR validator and the visibility fixup pass

use compiler::ir::{
    Arg, ContinuationType, DefType, FixupVariables, ForeachSettings, Instruction, Opcode, Program,
    ProgramBuilder, ScalarType, Validator, Var, VarStorage, VarType,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn stack(name: String) -> Var {
    Var::new(name, VarType::Future(ScalarType::Int), VarStorage::Stack, DefType::LocalUser)
}

/// One function with `width` statements per block, nested `depth` loops deep
fn generate_nested_loops(depth: usize, width: usize) -> Program {
    let mut builder = ProgramBuilder::new();
    builder.start_function("main");

    let mut outer = Vec::new();
    for level in 0..depth {
        for i in 0..width {
            let v = builder.declare(stack(format!("v{}_{}", level, i))).unwrap();
            let inputs = outer.iter().take(4).map(Arg::from).collect();
            builder
                .build(Instruction::new(Opcode::CallLocal, inputs, vec![v.clone()]))
                .unwrap();
            outer.insert(0, v);
        }
        let settings = ForeachSettings {
            spawns_tasks: level % 2 == 0,
            ..ForeachSettings::default()
        };
        let lp = builder
            .build_continuation(ContinuationType::ForeachLoop(settings))
            .unwrap();
        let body = builder.add_branch(lp).unwrap();
        builder.switch_to_block(body);
    }

    let mut program = builder.finish();
    FixupVariables::repair(&mut program).unwrap();
    program
}

/// Many small independent functions
fn generate_many_functions(count: usize) -> Program {
    let mut builder = ProgramBuilder::new();
    for f in 0..count {
        builder.start_function(format!("f{}", f));
        let a = builder.declare(stack("a".to_string())).unwrap();
        let b = builder.declare(stack("b".to_string())).unwrap();
        builder
            .build(Instruction::new(Opcode::StoreScalar, vec![Arg::Int(f as i64)], vec![a.clone()]))
            .unwrap();
        builder
            .build(Instruction::new(Opcode::CallLocal, vec![Arg::from(&a)], vec![b]))
            .unwrap();
        builder.finish_function();
    }
    builder.finish()
}

fn benchmark_nested_loops(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_nested_loops");

    for depth in [4, 16, 64].iter() {
        let program = generate_nested_loops(*depth, 8);

        group.bench_with_input(BenchmarkId::from_parameter(depth), &program, |b, program| {
            let validator = Validator::standard();
            b.iter(|| {
                let result = validator.validate(black_box(program));
                black_box(result)
            });
        });
    }

    group.finish();
}

fn benchmark_many_functions(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_many_functions");

    for count in [100, 1000].iter() {
        let program = generate_many_functions(*count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &program, |b, program| {
            let validator = Validator::final_form();
            b.iter(|| {
                let result = validator.validate(black_box(program));
                black_box(result)
            });
        });
    }

    group.finish();
}

fn benchmark_fixup(c: &mut Criterion) {
    let program = generate_nested_loops(32, 8);

    c.bench_function("fixup_repair", |b| {
        b.iter(|| {
            let mut copy = program.clone();
            black_box(FixupVariables::repair(&mut copy))
        });
    });
}

criterion_group!(
    benches,
    benchmark_nested_loops,
    benchmark_many_functions,
    benchmark_fixup
);

criterion_main!(benches);
