//! Criterion benchmarks for directory listing paths.

#![allow(clippy::unwrap_used)]

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use omnichat_core::{Page, Registry, Role, UserId, UserType};

fn populated_registry(agents: usize) -> Registry {
    let mut registry = Registry::new();
    for n in 0..agents {
        let account = registry
            .create_account(&format!("agent{n}"), "Agent", [Role::LivechatAgent])
            .unwrap();
        if n == 0 {
            let dept = registry.create_department("Support", "").unwrap();
            registry
                .assign_agent_to_department(&dept.id, &account.id)
                .unwrap();
        }
    }
    registry
}

fn bench_list_users(c: &mut Criterion) {
    let registry = populated_registry(1_000);
    c.bench_function("list_users_page_of_50", |b| {
        b.iter(|| {
            registry
                .list_users(black_box(UserType::Agent), Page::new(500, 50))
                .unwrap()
        });
    });
}

fn bench_departments_for_agent(c: &mut Criterion) {
    let registry = populated_registry(1_000);
    let agent = UserId("usr-1".to_string());
    c.bench_function("departments_for_agent", |b| {
        b.iter(|| registry.departments_for_agent(black_box(&agent)).unwrap());
    });
}

criterion_group!(benches, bench_list_users, bench_departments_for_agent);
criterion_main!(benches);
