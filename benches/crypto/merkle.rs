// Copyright (C) 2021 Quentin M. Kniep <hello@quentinkniep.com>
// Distributed under terms of the MIT license.

use criterion::Criterion;

use rivtx::crypto::Tree;

pub fn merkle_root(c: &mut Criterion) {
    const ELEMENTS: usize = 100_000;
    let a: Vec<String> = (0..ELEMENTS).map(|i| format!("test{}", i)).collect();

    c.bench_function("merkle build+root (100k)", |b| {
        b.iter(|| {
            let tree = Tree::from_leaves(&a);
            tree.root()
        })
    });
}
