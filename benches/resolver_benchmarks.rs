use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use portal_authz::*;

fn setup_service() -> PermissionService {
    let mut builder = PermissionService::builder();
    builder.standard_modules();
    for id in 0..20u64 {
        let profile = ModuleCode::all().fold(
            Profile::new(ProfileId(id), &format!("profile-{id}"), id as i32),
            |profile, module| {
                profile.with_module(
                    module,
                    ActionPermissions::from_fn(|action| (id + action as u64) % 2 == 0),
                )
            },
        );
        builder.add_profile(profile).unwrap();
    }
    for user in 0..1_000u64 {
        if user % 3 == 0 {
            builder
                .add_override(
                    Override::new(UserId(user), ModuleCode::Sales)
                        .with(Action::Approve, OverrideValue::Allow),
                )
                .unwrap();
        }
    }
    builder.build()
}

fn bench_resolve(c: &mut Criterion) {
    let service = setup_service();
    let with_override = User::new(UserId(300)).with_profile(ProfileId(4));
    let profile_only = User::new(UserId(301)).with_profile(ProfileId(4));
    let admin = User::new(UserId(1)).admin();

    let mut group = c.benchmark_group("resolve");
    group.bench_function("override", |b| {
        b.iter(|| service.resolve(black_box(&with_override), ModuleCode::Sales, Action::Approve))
    });
    group.bench_function("profile_default", |b| {
        b.iter(|| service.resolve(black_box(&profile_only), ModuleCode::Sales, Action::Edit))
    });
    group.bench_function("admin_bypass", |b| {
        b.iter(|| service.resolve(black_box(&admin), ModuleCode::Admin, Action::Delete))
    });
    group.bench_function("named", |b| {
        b.iter(|| {
            service.resolve_named(black_box(&profile_only), black_box("SALES"), black_box("edit"))
        })
    });
    group.finish();
}

fn bench_matrix(c: &mut Criterion) {
    let service = setup_service();
    let user = User::new(UserId(300)).with_profile(ProfileId(4));
    let snapshot = service.snapshot();

    let mut group = c.benchmark_group("effective_permissions");
    group.bench_function("uncached", |b| {
        b.iter(|| snapshot.resolver().effective_permissions(black_box(&user)))
    });
    group.bench_function("cached", |b| b.iter(|| service.effective_permissions(black_box(&user))));
    group.finish();
}

criterion_group!(benches, bench_resolve, bench_matrix);
criterion_main!(benches);
