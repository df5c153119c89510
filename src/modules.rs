use crate::{ModuleRegistry, define_modules};

define_modules! {
    /// Permission domains of the HR administration console
    pub modules HrModule {
        Policies => "Policies",
        Employee => "Employee",
        Department => "Department",
        Designation => "Designation",
        Attendance => "Attendance",
        Leave => "Leave",
        Payroll => "Payroll",
        Holidays => "Holidays",
        Announcements => "Announcements",
        Documents => "Documents",
        Roles => "Roles",
        /// Every action has to be granted by hand
        SupportingTickets => "Supporting Tickets" (exempt),
    }
}

/// Registry of the built-in HR console modules
pub fn hr_registry() -> ModuleRegistry {
    ModuleRegistry::of::<HrModule>()
}
