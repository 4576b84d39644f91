use derive_more::Display;

/// The event class an animation definition is attached to
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub enum EventCategory {
    /// Runs once when the object is created
    OnCreate,
    /// Edge-triggered when the view ray first hits the object
    OnFocus,
    /// Runs while the view ray keeps hitting the object
    InFocus,
    /// Pointer click/tap on the object
    OnClick,
    /// Runs while the wall clock is inside a `Time:` window
    InTimeWindow,
    /// Runs while the object's node is enabled
    WhileEnabled,
    /// An external tracked trigger appeared
    WhenActivated,
    /// An external tracked trigger disappeared
    WhenDeactivated,
    /// Re-activates at random intervals
    Periodic,
    /// Orients the node towards the viewer every frame
    Billboard,
}

impl EventCategory {
    pub const ALL: [EventCategory; 10] = [
        EventCategory::OnCreate,
        EventCategory::OnFocus,
        EventCategory::InFocus,
        EventCategory::OnClick,
        EventCategory::InTimeWindow,
        EventCategory::WhileEnabled,
        EventCategory::WhenActivated,
        EventCategory::WhenDeactivated,
        EventCategory::Periodic,
        EventCategory::Billboard,
    ];
}
