use solana_pubkey::Pubkey;

/// Seeds of the mint PDA owned by a synthetic warp route program. Callers go
/// through [`synthetic_mint`] only.
pub const SYNTHETIC_MINT_SEEDS: [&[u8]; 3] = [b"hyperlane_token", b"-", b"mint"];

/// Mint address of a synthetic token whose router program is `program_id`.
pub fn synthetic_mint(program_id: &Pubkey) -> Option<Pubkey> {
    Pubkey::try_find_program_address(&SYNTHETIC_MINT_SEEDS, program_id).map(|(mint, _bump)| mint)
}
