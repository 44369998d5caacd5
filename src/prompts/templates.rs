//! Built-in prompt templates.
//!
//! Task templates carry a `{molecule}` placeholder; the relabel template
//! carries a `{code}` placeholder.

/// Blood-brain barrier penetration (binary classification).
pub const BBBP: &str = "Does the following molecule penetrate the blood-brain barrier?\n\n{molecule}\n\nRespond with \"yes\" or \"no\".\n\nAnswer:";

/// Functional group detection (multi-label).
pub const FUNC_GROUP: &str = "Which of the following functional groups are present in this molecule?\n\n{molecule}\n\nPossible groups: hydroxyl (-OH), carboxyl (-COOH), amine (-NH2), amide (-C(=O)NH-), ester (-C(=O)O-C), ether (C-O-C), nitro (-NO2), halide (-F/-Cl/-Br/-I)\n\nRespond with ONLY a comma-separated list of the group names that are present. For example: hydroxyl, amine, halide\n\nAnswer:";

/// Aromatic ring counting.
pub const AROMATIC_RINGS: &str = "How many aromatic rings are in the following molecule?\n\n{molecule}\n\nRespond with a single integer.\n\nAnswer:";

/// Hydrogen bond donor/acceptor counting.
pub const HBOND: &str = "How many hydrogen bond donors and hydrogen bond acceptors does this molecule have?\n\n{molecule}\n\nRespond in the format: donors=X, acceptors=Y\n\nAnswer:";

/// Identifier-renaming pass applied to the code representation.
pub const RELABEL: &str = "The following code constructs a molecule using the smiles-js library. The variable names are auto-generated and not meaningful. Rename all variables to reflect what each part of the molecule is (e.g., phenylRing, methylBranch, acetylGroup, amideBond). Do not change any logic, only variable names.\n\n{code}\n\nAnswer:";
