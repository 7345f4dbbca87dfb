use tracing::{debug, info};

use crate::domain::{Amount, LedgerState, Member, period::PERIOD_LENGTH_DAYS};

/// What closing a period did to one member's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Surplus { banked: Amount },
    Shortfall { deficit: Amount, drawn: Amount },
}

/// Closes the current period for every present member: surplus over the
/// quota goes to the bank, a shortfall is paid out of the bank into `total`
/// as far as the bank allows. Absent members are left frozen.
///
/// Must run once per real period boundary. Running it twice without a new
/// snapshot settles an extra period of zero donations.
pub fn settle_period(mut state: LedgerState, quota_per_day: Amount) -> LedgerState {
    let quota = quota_per_day.saturating_mul(PERIOD_LENGTH_DAYS);
    let mut settled = 0usize;

    for member in state.members.values_mut().filter(|m| !m.absent) {
        let outcome = settle_member(member, quota);
        debug!(member = %member.name, ?outcome, bank = member.bank, "settled");
        settled += 1;
    }

    info!(settled, quota, "period closed");
    state
}

fn settle_member(member: &mut Member, quota: Amount) -> Settlement {
    let donation = member.period_total;
    member.period_total = 0;

    if donation >= quota {
        let banked = donation - quota;
        member.bank = member.bank.saturating_add(banked);
        Settlement::Surplus { banked }
    } else {
        let deficit = quota - donation;
        let drawn = deficit.min(member.bank);
        member.bank -= drawn;
        member.total = member.total.saturating_add(drawn);
        Settlement::Shortfall { deficit, drawn }
    }
}
