use granbond::core::contact::neighbor::ListKind;

pub struct DefaultsConfig {
    pub timestep: f64,
    pub steps: usize,
    pub newton_pair: bool,
    pub freeze_group_bit: u32,
    pub record_contacts: bool,
    pub neighbor_list: ListKind,
    /// Extra reach added to every pair cutoff when building neighbor lists.
    pub neighbor_skin: f64,
    pub ntypes: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            timestep: 1e-5,
            steps: 1,
            newton_pair: true,
            freeze_group_bit: 0,
            record_contacts: false,
            neighbor_list: ListKind::Half,
            neighbor_skin: 0.1,
            ntypes: 1,
        }
    }
}
