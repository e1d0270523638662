#[cfg(test)]
mod common;

#[cfg(test)]
mod auth_tests;

#[cfg(test)]
mod case_review_tests;

#[cfg(test)]
mod case_visibility_tests;



#[cfg(test)]
mod board_tests;
