mod add_user;
mod events;
mod helpers;
mod mocks;
