use bitpattern::{
    construct::Constructor,
    field::BuildField,
    qualifier::Qualifier,
    value::{Bindings, Value},
};
use criterion::{Criterion, criterion_group, criterion_main};

fn gen_constructor(field_count: usize) -> (Constructor, Bindings<'static>) {
    let mut fields = Vec::with_capacity(field_count);
    let mut env = Bindings::new();

    for i in 0..field_count {
        let name = format!("f{}", i);
        let field = if i % 2 == 0 {
            BuildField::var(name.clone(), 16)
        } else {
            BuildField::var(name.clone(), 13)
                .qualified([Qualifier::Unsigned, Qualifier::LittleEndian])
                .unwrap()
        };
        fields.push(field);
        env.insert(name, Value::U64((i * 31 % 4096) as u64));
    }

    fields.push(BuildField::var("payload", -1).qualified([Qualifier::String]).unwrap());
    env.insert("payload".to_string(), Value::Bytes(vec![0xA5; 64]));

    (Constructor::compile(&fields).unwrap(), env)
}

fn bench_construct(c: &mut Criterion) {
    for &field_count in &[1usize, 10, 50, 100] {
        let (constructor, env) = gen_constructor(field_count);

        c.bench_function(&format!("construct_{}_fields", field_count), |b| {
            b.iter(|| {
                let _ = constructor.construct(&env).unwrap();
            })
        });
    }
}

criterion_group!(benches, bench_construct);
criterion_main!(benches);
