use portal_authz::*;
use proptest::prelude::*;

fn arb_action() -> impl Strategy<Value = Action> {
    prop::sample::select(Action::ALL)
}

fn arb_module_code() -> impl Strategy<Value = ModuleCode> {
    prop::sample::select(ModuleCode::ALL)
}

fn arb_override_value() -> impl Strategy<Value = OverrideValue> {
    prop_oneof![
        Just(OverrideValue::Allow),
        Just(OverrideValue::Deny),
        Just(OverrideValue::Inherit),
    ]
}

fn arb_permissions() -> impl Strategy<Value = ActionPermissions> {
    any::<[bool; 5]>().prop_map(|flags| ActionPermissions {
        view: flags[0],
        create: flags[1],
        edit: flags[2],
        delete: flags[3],
        approve: flags[4],
    })
}

fn arb_user() -> impl Strategy<Value = User> {
    (0u64..8, any::<bool>(), any::<bool>(), prop::option::of(0u64..4)).prop_map(
        |(id, admin, active, profile)| User {
            id: UserId(id),
            admin,
            active,
            profile_id: profile.map(ProfileId),
        },
    )
}

prop_compose! {
    fn arb_override()(
        user in 0u64..8,
        module in arb_module_code(),
        values in prop::collection::vec(arb_override_value(), 5),
    ) -> Override {
        Action::all()
            .zip(values)
            .fold(Override::new(UserId(user), module), |row, (action, value)| {
                row.with(action, value)
            })
    }
}

prop_compose! {
    fn arb_profile()(
        id in 0u64..4,
        entries in prop::collection::btree_map(arb_module_code(), arb_permissions(), 0..4),
    ) -> Profile {
        entries.into_iter().fold(
            Profile::new(ProfileId(id), &format!("profile-{id}"), id as i32),
            |profile, (module, perms)| profile.with_module(module, perms),
        )
    }
}

prop_compose! {
    fn arb_service()(
        active in prop::collection::vec(any::<bool>(), 4),
        profiles in prop::collection::vec(arb_profile(), 0..4),
        overrides in prop::collection::vec(arb_override(), 0..12),
    ) -> PermissionService {
        let mut builder = PermissionService::builder();
        for (module, active) in Module::standard().into_iter().zip(active) {
            builder.add_module(Module { active, ..module });
        }
        for profile in profiles {
            // Duplicate ids replace each other; names follow ids so they never clash
            builder.add_profile(profile).unwrap();
        }
        for row in overrides {
            builder.add_override(row).unwrap();
        }
        builder.build()
    }
}

proptest! {
    /// Inactive users are denied everything, admin flag, overrides and profiles notwithstanding.
    #[test]
    fn prop_inactive_user_denied(
        service in arb_service(),
        user in arb_user(),
        module in arb_module_code(),
        action in arb_action(),
    ) {
        let user = User { active: false, ..user };
        prop_assert_eq!(service.resolve(&user, module, action), Decision::Deny);
    }

    /// Inactive modules deny everybody; active ones allow every admin.
    #[test]
    fn prop_module_gate_and_admin_supremacy(
        service in arb_service(),
        user in arb_user(),
        module in arb_module_code(),
        action in arb_action(),
    ) {
        let admin = User { admin: true, active: true, ..user };
        let module_active = service.snapshot().modules().module(module).is_some_and(|m| m.active);
        let decision = service.resolve(&admin, module, action);
        prop_assert_eq!(decision.is_allowed(), module_active);
        if !module_active {
            prop_assert_eq!(service.resolve(&user, module, action), Decision::Deny);
        }
    }

    /// An explicit override decides for non-admins on active modules.
    #[test]
    fn prop_override_precedence(
        service in arb_service(),
        user in arb_user(),
        module in arb_module_code(),
        action in arb_action(),
        value in arb_override_value(),
    ) {
        let user = User { admin: false, active: true, ..user };
        let mut updater = service.updater_copy();
        updater.set_module_active(module, true).unwrap();
        updater.set_override(Override::new(user.id, module).with(action, value)).unwrap();
        updater.update(&service);

        let trace = service.explain(&user, module, action);
        match value.decision() {
            Some(decision) => {
                prop_assert_eq!(trace.decision, decision);
                prop_assert_eq!(trace.rule, Rule::UserOverride);
            }
            None => prop_assert_ne!(trace.rule, Rule::UserOverride),
        }
    }

    /// Without an explicit override the profile entry decides, else the hard default.
    #[test]
    fn prop_inherit_falls_through(
        service in arb_service(),
        user in arb_user(),
        module in arb_module_code(),
        action in arb_action(),
    ) {
        let user = User { admin: false, active: true, ..user };
        let mut updater = service.updater_copy();
        updater.set_module_active(module, true).unwrap();
        updater.clear_overrides(user.id);
        updater.update(&service);

        let snapshot = service.snapshot();
        let expected = user
            .profile_id
            .and_then(|id| snapshot.profiles().profile(id))
            .and_then(|profile| profile.defaults_for(module))
            .map(|perms| Decision::from(perms.get(action)))
            .unwrap_or(action.hard_default());
        prop_assert_eq!(service.resolve(&user, module, action), expected);
    }

    /// The matrix never disagrees with a direct call.
    #[test]
    fn prop_matrix_consistent_with_resolve(service in arb_service(), user in arb_user()) {
        let matrix = service.effective_permissions(&user);
        for module in ModuleCode::all() {
            for action in Action::all() {
                prop_assert_eq!(
                    matrix.allows(module, action),
                    service.resolve(&user, module, action).is_allowed()
                );
            }
        }
        let active: Vec<ModuleCode> =
            service.active_modules().into_iter().map(|m| m.code).collect();
        prop_assert_eq!(matrix.modules().collect::<Vec<_>>(), active);
    }

    /// Same snapshot, same answer.
    #[test]
    fn prop_resolution_is_deterministic(
        service in arb_service(),
        user in arb_user(),
        module in arb_module_code(),
        action in arb_action(),
    ) {
        let first = service.explain(&user, module, action);
        let second = service.explain(&user, module, action);
        prop_assert_eq!(first, second);
        prop_assert_eq!(service.resolve_named(&user, module.code(), action.code()), first.decision);
    }
}
