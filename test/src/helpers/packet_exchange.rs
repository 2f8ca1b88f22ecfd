use log::debug;

use super::{TestClient, TestHost};

const MAX_ROUNDS: usize = 64;

/// Runs one round: every client sends to the host, then the host answers
/// every client. Returns how many payloads moved.
fn exchange_round(host: &TestHost, clients: &mut [&mut TestClient]) -> usize {
    let mut moved = 0;
    for client in clients.iter_mut() {
        moved += client.send_to_host(host);
    }
    for client in clients.iter_mut() {
        moved += client.receive_from_host(host);
    }
    moved
}

/// Exchanges packets between host and clients until nothing is left to
/// send. Returns how many payloads moved in total.
pub fn exchange_packets(host: &TestHost, clients: &mut [&mut TestClient]) -> usize {
    let mut total = 0;
    for round in 0..MAX_ROUNDS {
        let moved = exchange_round(host, clients);
        if moved == 0 {
            debug!("exchange settled after {} rounds", round);
            return total;
        }
        total += moved;
    }
    panic!("exchange did not settle after {} rounds", MAX_ROUNDS);
}

/// Runs exactly `n` exchange rounds
pub fn exchange_packets_n_times(host: &TestHost, clients: &mut [&mut TestClient], n: usize) -> usize {
    (0..n).map(|_| exchange_round(host, clients)).sum()
}
