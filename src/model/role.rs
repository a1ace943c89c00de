#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Agent = 1,
    TeamLead = 2,
    Wfm = 3,
    System = 4,
}

impl Role {
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Role::Agent),
            2 => Some(Role::TeamLead),
            3 => Some(Role::Wfm),
            4 => Some(Role::System),
            _ => None,
        }
    }

    pub fn as_id(&self) -> i16 {
        *self as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_id_roundtrip() {
        for id in 1..=4 {
            let role = Role::from_id(id).unwrap();
            assert_eq!(role.as_id(), id);
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(99), None);
    }
}
