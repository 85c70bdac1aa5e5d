use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::department::DepartmentPayload;
use crate::api::employee::{EmployeeDetail, EmployeePayload};
use crate::api::position::PositionPayload;
use crate::api::rank::RankPayload;
use crate::api::role::RolePayload;
use crate::api::user::{CreateUser, UpdateUser, UserResponse};
use crate::api::vacation::{VacationPayload, VacationWithEmployee, VacationWithStaffing};
use crate::auth::handlers::{LoginRequest, TokenResponse};
use crate::model::department::Department;
use crate::model::employee::Employee;
use crate::model::position::Position;
use crate::model::rank::Rank;
use crate::model::role::Role;
use crate::model::vacation::VacationPeriod;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vacation Scheduling API",
        version = "1.0.0",
        description = r#"
## Vacation-scheduling administration backend

Manages organizational reference data (departments, positions, ranks,
roles), employee records with a supervisor hierarchy, user accounts with
role-based access, vacation bookings, and printable vacation schedules.

### Security
All routes except `/auth/login` require **JWT Bearer authentication**.
Tokens expire after a fixed window (default 30 minutes); re-login after
expiry. User administration is restricted to the **admin** role, other
mutations to **HR** or **admin**.
"#,
    ),
    paths(
        crate::auth::handlers::login,

        crate::api::department::list_departments,
        crate::api::department::get_department,
        crate::api::department::create_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::position::list_positions,
        crate::api::position::get_position,
        crate::api::position::create_position,
        crate::api::position::update_position,
        crate::api::position::delete_position,

        crate::api::rank::list_ranks,
        crate::api::rank::get_rank,
        crate::api::rank::create_rank,
        crate::api::rank::update_rank,
        crate::api::rank::delete_rank,

        crate::api::role::list_roles,
        crate::api::role::get_role,
        crate::api::role::create_role,
        crate::api::role::update_role,
        crate::api::role::delete_role,

        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::list_by_supervisor,
        crate::api::employee::create_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::create_user,
        crate::api::user::update_user,
        crate::api::user::delete_user,

        crate::api::vacation::list_vacations,
        crate::api::vacation::get_vacation,
        crate::api::vacation::list_by_employee,
        crate::api::vacation::list_by_boss,
        crate::api::vacation::list_by_department,
        crate::api::vacation::create_vacation,
        crate::api::vacation::update_vacation,
        crate::api::vacation::delete_vacation,

        crate::api::schedule_doc::generate_department_schedule,
        crate::api::schedule_doc::generate_full_schedule,
    ),
    components(
        schemas(
            LoginRequest,
            TokenResponse,
            Department,
            DepartmentPayload,
            Position,
            PositionPayload,
            Rank,
            RankPayload,
            Role,
            RolePayload,
            Employee,
            EmployeePayload,
            EmployeeDetail,
            CreateUser,
            UpdateUser,
            UserResponse,
            VacationPeriod,
            VacationPayload,
            VacationWithEmployee,
            VacationWithStaffing,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Session management"),
        (name = "Departments", description = "Department registry"),
        (name = "Positions", description = "Position registry"),
        (name = "Ranks", description = "Rank registry"),
        (name = "Roles", description = "Role registry"),
        (name = "Employees", description = "Employee records and hierarchy"),
        (name = "Users", description = "User accounts"),
        (name = "Vacations", description = "Vacation ledger"),
        (name = "Generate", description = "Printable schedule export"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
