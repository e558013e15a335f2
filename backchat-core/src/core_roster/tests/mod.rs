mod friend_requests;
mod support;
