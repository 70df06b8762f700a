// ============================================================================
// Fixtures - the portal's standard profiles and a few feature-side callers
// ============================================================================
#[cfg(test)]
pub mod test {
    use crate::{
        Action, ActionPermissions, ModuleCode, PermissionDenied, PermissionService, Profile,
        ProfileId, Subject, User, UserId,
    };

    pub const ADMINISTRATOR: ProfileId = ProfileId(1);
    pub const MANAGER: ProfileId = ProfileId(2);
    pub const SALESPERSON: ProfileId = ProfileId(3);
    pub const PRODUCTION_OPERATOR: ProfileId = ProfileId(4);
    pub const QUALITY: ProfileId = ProfileId(5);

    fn read_only() -> ActionPermissions {
        ActionPermissions::from_actions(&[Action::View])
    }

    pub fn standard_profiles() -> Vec<Profile> {
        use ModuleCode::*;

        vec![
            Profile::new(ADMINISTRATOR, "Administrator", 10)
                .with_description("Full access to the system")
                .with_module(Production, ActionPermissions::all())
                .with_module(Quality, ActionPermissions::all())
                .with_module(Sales, ActionPermissions::all())
                .with_module(Admin, ActionPermissions::all()),
            Profile::new(MANAGER, "Manager", 5)
                .with_description("Full access to operational modules")
                .with_module(Production, ActionPermissions::all())
                .with_module(Quality, ActionPermissions::all())
                .with_module(Sales, ActionPermissions::all())
                .with_module(Admin, read_only()),
            Profile::new(SALESPERSON, "Salesperson", 2)
                .with_description("Sales module access")
                .with_module(Production, read_only())
                .with_module(Quality, ActionPermissions::none())
                .with_module(
                    Sales,
                    ActionPermissions::from_actions(&[Action::View, Action::Create, Action::Edit]),
                )
                .with_module(Admin, ActionPermissions::none()),
            Profile::new(PRODUCTION_OPERATOR, "Production Operator", 1)
                .with_description("Production module access")
                .with_module(
                    Production,
                    ActionPermissions::from_actions(&[Action::View, Action::Create, Action::Edit]),
                )
                .with_module(
                    Quality,
                    ActionPermissions::from_actions(&[Action::View, Action::Create]),
                )
                .with_module(Sales, ActionPermissions::none())
                .with_module(Admin, ActionPermissions::none()),
            Profile::new(QUALITY, "Quality", 2)
                .with_description("Quality module access")
                .with_module(Production, read_only())
                .with_module(Quality, ActionPermissions::all())
                .with_module(Sales, ActionPermissions::none())
                .with_module(Admin, ActionPermissions::none()),
        ]
    }

    pub fn setup_service() -> PermissionService {
        // Normally loaded from the database
        let mut builder = PermissionService::builder();
        builder.standard_modules();
        builder
            .load_profiles(standard_profiles())
            .expect("standard profiles are valid");
        builder.build()
    }

    pub fn admin() -> User {
        User::new(UserId(1)).admin()
    }

    pub fn salesperson() -> User {
        User::new(UserId(20)).with_profile(SALESPERSON)
    }

    pub fn operator() -> User {
        User::new(UserId(30)).with_profile(PRODUCTION_OPERATOR)
    }

    pub fn unassigned() -> User {
        User::new(UserId(40))
    }

    pub fn create_proposal(
        user: &impl Subject,
        service: &PermissionService,
    ) -> Result<UserId, PermissionDenied> {
        service.check(user, ModuleCode::Sales, Action::Create)?;
        Ok(user.id())
    }

    pub fn approve_corrective_action(
        user: &impl Subject,
        service: &PermissionService,
    ) -> Result<UserId, PermissionDenied> {
        service.check(user, ModuleCode::Quality, Action::View)?;
        service.check(user, ModuleCode::Quality, Action::Approve)?;
        Ok(user.id())
    }
}
