//! Wizard steps.

use serde::{Deserialize, Serialize};

/// The six linear steps of the order wizard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Client,
    Equipment,
    Services,
    Products,
    Expenses,
    Summary,
}

impl WizardStep {
    pub const ALL: [WizardStep; 6] = [
        WizardStep::Client,
        WizardStep::Equipment,
        WizardStep::Services,
        WizardStep::Products,
        WizardStep::Expenses,
        WizardStep::Summary,
    ];

    pub const FIRST: WizardStep = WizardStep::Client;
    pub const LAST: WizardStep = WizardStep::Summary;

    /// 1-based position.
    pub fn ordinal(&self) -> u8 {
        match self {
            WizardStep::Client => 1,
            WizardStep::Equipment => 2,
            WizardStep::Services => 3,
            WizardStep::Products => 4,
            WizardStep::Expenses => 5,
            WizardStep::Summary => 6,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(usize::from(ordinal).checked_sub(1)?).copied()
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::Client => "Cliente",
            WizardStep::Equipment => "Equipamento",
            WizardStep::Services => "Serviços",
            WizardStep::Products => "Produtos",
            WizardStep::Expenses => "Despesas",
            WizardStep::Summary => "Resumo",
        }
    }

    /// Following step, clamped at the last one.
    pub fn next(self) -> Self {
        Self::from_ordinal(self.ordinal() + 1).unwrap_or(Self::LAST)
    }

    /// Preceding step, clamped at the first one.
    pub fn previous(self) -> Self {
        Self::from_ordinal(self.ordinal() - 1).unwrap_or(Self::FIRST)
    }

    pub fn is_last(&self) -> bool {
        *self == Self::LAST
    }
}
